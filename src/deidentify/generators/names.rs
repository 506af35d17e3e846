//! Synthetic name generation
//!
//! Produces demographically plausible but clearly synthetic names in HL7
//! XPN/XCN component form. Selection is deterministic from the session
//! salt and the normalized original; the probe counter walks to the next
//! candidate pair on collision.

use super::derive_u64;

/// Common US surnames, used for synthetic family names
const SURNAMES: &[&str] = &[
    "ANDERSON", "BAKER", "BENNETT", "BROOKS", "CAMPBELL", "CARTER", "COLLINS", "COOPER", "DIAZ",
    "EDWARDS", "EVANS", "FISHER", "FOSTER", "GRAHAM", "GRIFFIN", "HAYES", "HENDERSON", "HUGHES",
    "JENKINS", "KELLY", "MARSHALL", "MASON", "MITCHELL", "MORGAN", "MURPHY", "MYERS", "OWENS",
    "PALMER", "PARKER", "PETERSON", "PORTER", "REYNOLDS", "RICHARDSON", "ROSS", "SIMMONS",
    "STEWART", "SULLIVAN", "WALLACE", "WARREN", "WEBB",
];

/// Common given names, mixed gender
const GIVEN_NAMES: &[&str] = &[
    "ALICE", "ALBERT", "BEATRICE", "BERNARD", "CAROLINE", "CHARLES", "DOROTHY", "DOUGLAS",
    "ELEANOR", "ERNEST", "FLORENCE", "FRANCIS", "GRACE", "GERALD", "HELEN", "HAROLD", "IRENE",
    "ISAAC", "JOSEPHINE", "JULIAN", "KATHERINE", "KENNETH", "LILLIAN", "LEONARD", "MARGARET",
    "MARTIN", "NORA", "NATHAN", "OLIVE", "OSCAR", "PEARL", "PHILIP", "RUTH", "RAYMOND", "SYLVIA",
    "STANLEY", "VIOLET", "VINCENT", "WINIFRED", "WALTER",
];

/// Synthetic patient name in XPN form: FAMILY^GIVEN
pub fn person_name(salt: &str, normalized: &str, probe: u32) -> String {
    let (family, given) = pick_pair(salt, "person-name", normalized, probe);
    format!("{family}^{given}")
}

/// Synthetic provider name in XCN form: ^FAMILY^GIVEN
///
/// The leading component (the provider's id number) is left empty; id
/// numbers detected separately transform through the identifier
/// generator.
pub fn provider_name(salt: &str, normalized: &str, probe: u32) -> String {
    let (family, given) = pick_pair(salt, "provider-name", normalized, probe);
    format!("^{family}^{given}")
}

fn pick_pair(salt: &str, kind: &str, normalized: &str, probe: u32) -> (&'static str, &'static str) {
    let probe = probe.to_string();
    let index = derive_u64(salt, &[kind, normalized, &probe]);
    let family = SURNAMES[(index % SURNAMES.len() as u64) as usize];
    let given = GIVEN_NAMES[((index >> 16) % GIVEN_NAMES.len() as u64) as usize];
    (family, given)
}

/// Surname by raw index, used by the address fabricator for street names
pub(crate) fn surname(index: u64) -> &'static str {
    SURNAMES[(index % SURNAMES.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_name_deterministic() {
        let a = person_name("salt", "SMITH^JOHN^A", 0);
        let b = person_name("salt", "SMITH^JOHN^A", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_person_name_differs_from_original() {
        let name = person_name("salt", "SMITH^JOHN^A", 0);
        assert_ne!(name, "SMITH^JOHN^A");
        assert!(name.contains('^'));
    }

    #[test]
    fn test_probe_walks_candidates() {
        let a = person_name("salt", "SMITH^JOHN", 0);
        let b = person_name("salt", "SMITH^JOHN", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_provider_name_has_empty_id_component() {
        let name = provider_name("salt", "1234^HOUSE^GREGORY", 0);
        assert!(name.starts_with('^'));
        let components: Vec<&str> = name.split('^').collect();
        assert_eq!(components.len(), 3);
        assert!(components[0].is_empty());
    }

    #[test]
    fn test_tables_only_synthetic_values() {
        let name = person_name("salt", "ZZZUNUSUAL^NAME", 0);
        let family = name.split('^').next().unwrap();
        assert!(SURNAMES.contains(&family));
    }
}
