//! Namespace discovery
//!
//! Identity attributes are frequently stored under vendor GUIDs the operator
//! does not know. Resolution tries, in order: the operator-supplied
//! namespace (no fallback), a short static list of well-known namespaces,
//! and finally an exhaustive cursor walk of the entire store. The namespace
//! a value was actually found under is part of the result and must be
//! threaded into any later operation on the same attribute.

use r_efi::efi::Guid;

use super::{AttributeValue, EntryId, Result, VarError, VariableStore};

/// A well-known namespace candidate
pub struct WellKnownNamespace {
    pub label: &'static str,
    pub guid: Guid,
}

/// Vendor-custom namespace used by the provisioning toolchain
pub const CUSTOM_NAMESPACE: Guid = Guid::from_fields(
    0x12345678,
    0x1234,
    0x1234,
    0x12,
    0x34,
    &[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc],
);

/// EFI global variable namespace
pub const GLOBAL_NAMESPACE: Guid = Guid::from_fields(
    0x8be4df61,
    0x93ca,
    0x11d2,
    0xaa,
    0x0d,
    &[0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c],
);

/// Microsoft vendor namespace
pub const MSFT_NAMESPACE: Guid = Guid::from_fields(
    0x77fa9abd,
    0x0359,
    0x4d32,
    0xbd,
    0x60,
    &[0x28, 0xf4, 0xe7, 0x8f, 0x78, 0x4b],
);

/// Common system-configuration vendor namespace
pub const SYSTEM_NAMESPACE: Guid = Guid::from_fields(
    0xec87d643,
    0xeba4,
    0x4bb5,
    0xa1,
    0xe5,
    &[0x3f, 0x3e, 0x36, 0xb2, 0x0d, 0xa9],
);

/// Namespaces tried, in order, before falling back to full enumeration
///
/// Read-only; baked in at build time.
pub static WELL_KNOWN_NAMESPACES: [WellKnownNamespace; 4] = [
    WellKnownNamespace {
        label: "Custom",
        guid: CUSTOM_NAMESPACE,
    },
    WellKnownNamespace {
        label: "Global",
        guid: GLOBAL_NAMESPACE,
    },
    WellKnownNamespace {
        label: "Microsoft",
        guid: MSFT_NAMESPACE,
    },
    WellKnownNamespace {
        label: "System",
        guid: SYSTEM_NAMESPACE,
    },
];

/// A resolved attribute: the value and the namespace it was found under
#[derive(Debug)]
pub struct Resolved {
    pub value: AttributeValue,
    pub namespace: Guid,
    /// Label when the namespace came from the well-known list
    pub label: Option<&'static str>,
}

/// Find a variable by name, discovering its namespace if necessary
///
/// With a concrete `namespace` the store is queried directly and any outcome
/// (found, not-found, error) is final. Otherwise the well-known list is
/// tried in fixed order, then the whole store is enumerated; the first entry
/// whose name matches wins. Store errors other than not-found propagate
/// immediately and are never retried here.
pub fn resolve<S: VariableStore>(
    store: &mut S,
    name: &str,
    namespace: Option<Guid>,
) -> Result<Resolved> {
    if let Some(ns) = namespace {
        let value = store.get(name, &ns)?;
        return Ok(Resolved {
            value,
            namespace: ns,
            label: None,
        });
    }

    for candidate in &WELL_KNOWN_NAMESPACES {
        match store.get(name, &candidate.guid) {
            Ok(value) => {
                return Ok(Resolved {
                    value,
                    namespace: candidate.guid,
                    label: Some(candidate.label),
                })
            }
            Err(VarError::NotFound) => continue,
            Err(e) => return Err(e),
        }
    }

    // O(store size) fallback for attributes under vendor-specific or
    // dynamically-assigned namespaces.
    let mut cursor: Option<EntryId> = None;
    loop {
        match store.get_next(cursor.as_ref())? {
            Some(entry) => {
                if entry.name == name {
                    let value = store.get(&entry.name, &entry.namespace)?;
                    return Ok(Resolved {
                        value,
                        namespace: entry.namespace,
                        label: None,
                    });
                }
                cursor = Some(entry);
            }
            None => return Err(VarError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varstore::{attributes, MemStore};

    /// A namespace deliberately absent from the well-known list
    const VENDOR_NS: Guid = Guid::from_fields(
        0xdeadbeef,
        0xcafe,
        0x4001,
        0x88,
        0x11,
        &[1, 2, 3, 4, 5, 6],
    );

    #[test]
    fn explicit_namespace_is_final() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            CUSTOM_NAMESPACE,
            attributes::NON_VOLATILE,
            b"SN1",
        );

        // Present under Custom, but the caller asked for Global: no fallback.
        let err = resolve(&mut store, "SerialNumber", Some(GLOBAL_NAMESPACE)).unwrap_err();
        assert_eq!(err, VarError::NotFound);

        let hit = resolve(&mut store, "SerialNumber", Some(CUSTOM_NAMESPACE)).unwrap();
        assert_eq!(hit.value.bytes, b"SN1");
        assert_eq!(hit.namespace, CUSTOM_NAMESPACE);
        assert_eq!(hit.label, None);
    }

    #[test]
    fn well_known_list_is_tried_in_order() {
        let mut store = MemStore::new();
        store.insert("SerialNumber", MSFT_NAMESPACE, 0, b"ms");
        store.insert("SerialNumber", SYSTEM_NAMESPACE, 0, b"sys");

        let hit = resolve(&mut store, "SerialNumber", None).unwrap();
        assert_eq!(hit.value.bytes, b"ms");
        assert_eq!(hit.label, Some("Microsoft"));
    }

    #[test]
    fn falls_through_to_full_enumeration() {
        let mut store = MemStore::new();
        store.insert("Other", CUSTOM_NAMESPACE, 0, b"x");
        store.insert("SerialNumber", VENDOR_NS, 0, b"SN-vendor");

        let hit = resolve(&mut store, "SerialNumber", None).unwrap();
        assert_eq!(hit.value.bytes, b"SN-vendor");
        assert_eq!(hit.namespace, VENDOR_NS);
        assert_eq!(hit.label, None);
    }

    #[test]
    fn exhausted_enumeration_is_not_found() {
        let mut store = MemStore::new();
        store.insert("Other", VENDOR_NS, 0, b"x");

        let err = resolve(&mut store, "SerialNumber", None).unwrap_err();
        assert_eq!(err, VarError::NotFound);
    }

    #[test]
    fn store_errors_propagate_unretried() {
        let mut store = MemStore::new();
        store.insert("SerialNumber", VENDOR_NS, 0, b"SN");
        store.fail_reads_of("SerialNumber", VarError::DeviceError);

        let err = resolve(&mut store, "SerialNumber", None).unwrap_err();
        assert_eq!(err, VarError::DeviceError);
    }
}
