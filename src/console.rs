//! Console output over the system table's text protocols
//!
//! Converts UTF-8 to the NUL-terminated UCS-2 the Simple Text Output
//! protocol wants, expanding `\n` to `\r\n`, and provides the keypress wait
//! used by the interactive display mode.

use core::fmt;

use r_efi::protocols::simple_text_input::InputKey;

use crate::platform;

/// UCS-2 staging buffer size (units, including the terminator)
const CHUNK_UNITS: usize = 128;

/// Write a string to the console
pub fn write_str(s: &str) {
    let st = platform::system_table();
    let out = unsafe { (*st).con_out };
    if out.is_null() {
        return;
    }

    let mut buf = [0u16; CHUNK_UNITS];
    let mut len = 0usize;

    let mut push = |unit: u16, buf: &mut [u16; CHUNK_UNITS], len: &mut usize| {
        buf[*len] = unit;
        *len += 1;
        if *len == CHUNK_UNITS - 1 {
            buf[*len] = 0;
            let _ = unsafe { ((*out).output_string)(out, buf.as_mut_ptr()) };
            *len = 0;
        }
    };

    for c in s.chars() {
        let unit = if (c as u32) <= 0xFFFF {
            c as u16
        } else {
            b'?' as u16
        };
        if unit == b'\n' as u16 {
            push(b'\r' as u16, &mut buf, &mut len);
        }
        push(unit, &mut buf, &mut len);
    }

    if len > 0 {
        buf[len] = 0;
        let _ = unsafe { ((*out).output_string)(out, buf.as_mut_ptr()) };
    }
}

/// Formatter target over the console
pub struct Console;

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        write_str(s);
        Ok(())
    }
}

/// Print to the console
#[macro_export]
macro_rules! efi_print {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::console::Console, $($arg)*);
    }};
}

/// Print to the console, with a newline
#[macro_export]
macro_rules! efi_println {
    () => { $crate::efi_print!("\n") };
    ($($arg:tt)*) => { $crate::efi_print!("{}\n", format_args!($($arg)*)) };
}

/// Clear the screen
pub fn clear_screen() {
    let st = platform::system_table();
    let out = unsafe { (*st).con_out };
    if out.is_null() {
        return;
    }
    let _ = unsafe { ((*out).clear_screen)(out) };
}

/// Block until the operator presses a key
pub fn wait_for_key() {
    let st = platform::system_table();
    let bs = platform::boot_services();
    let con_in = unsafe { (*st).con_in };
    if con_in.is_null() {
        return;
    }

    let mut index: usize = 0;
    let mut event = unsafe { (*con_in).wait_for_key };
    let _ = unsafe { ((*bs).wait_for_event)(1, &mut event, &mut index) };

    let mut key = InputKey {
        scan_code: 0,
        unicode_char: 0,
    };
    let _ = unsafe { ((*con_in).read_key_stroke)(con_in, &mut key) };
}
