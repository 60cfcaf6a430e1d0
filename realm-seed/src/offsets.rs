//! Diagnostic code ranges reserved per server module.
//!
//! Every fraction that emits numbered messages takes its codes from a block of
//! `RANGE_SIZE` integers starting at its base. Modules are built independently
//! and never negotiate at runtime, so the table below is the only arbiter: it
//! is checked for overlaps by a `const` assertion and the crate fails to
//! compile if two ranges intersect. Retired modules keep their block forever;
//! new modules are appended at `next_base(REGISTRY)`.

use thiserror::Error;

/// Number of consecutive codes owned by each module.
pub const RANGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleOffset {
    pub module: &'static str,
    pub base: u32,
    pub range_size: u32,
}

impl ModuleOffset {
    pub const fn new(module: &'static str, base: u32) -> Self {
        Self {
            module,
            base,
            range_size: RANGE_SIZE,
        }
    }

    /// First code past the end of this module's block.
    pub const fn end(&self) -> u32 {
        self.base.saturating_add(self.range_size)
    }

    pub const fn contains(&self, code: u32) -> bool {
        code >= self.base && code < self.end()
    }

    pub const fn overlaps(&self, other: &ModuleOffset) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    /// Maps a module-local message number onto its global diagnostic code.
    /// Returns `None` when the number would spill into the next module's block.
    pub const fn code(&self, local: u32) -> Option<u32> {
        if local < self.range_size {
            self.base.checked_add(local)
        } else {
            None
        }
    }
}

pub const CORE: ModuleOffset = ModuleOffset::new("core", 0);
pub const SERVLET: ModuleOffset = ModuleOffset::new("servlet", 1000);
pub const JAXRS: ModuleOffset = ModuleOffset::new("jaxrs", 2000);
pub const DATASOURCE: ModuleOffset = ModuleOffset::new("datasource", 3000);
pub const HEALTH: ModuleOffset = ModuleOffset::new("health", 4000);
pub const JDBC: ModuleOffset = ModuleOffset::new("jdbc", 5000);
pub const JNDI: ModuleOffset = ModuleOffset::new("jndi", 6000);
pub const JPA: ModuleOffset = ModuleOffset::new("jpa", 7000);
pub const JSONP: ModuleOffset = ModuleOffset::new("jsonp", 8000);
pub const JTA: ModuleOffset = ModuleOffset::new("jta", 9000);
pub const METRICS: ModuleOffset = ModuleOffset::new("metrics", 10000);
pub const SECURITY: ModuleOffset = ModuleOffset::new("security", 11000);
pub const KEYCLOAK: ModuleOffset = ModuleOffset::new("keycloak", 12000);
pub const MANAGEMENT: ModuleOffset = ModuleOffset::new("management", 13000);

/// Every reserved block, in allocation order. Append only.
pub const REGISTRY: &[ModuleOffset] = &[
    CORE, SERVLET, JAXRS, DATASOURCE, HEALTH, JDBC, JNDI, JPA, JSONP, JTA, METRICS, SECURITY,
    KEYCLOAK, MANAGEMENT,
];

const _: () = assert!(is_disjoint(REGISTRY), "diagnostic code ranges overlap");
const _: () = assert!(names_unique(REGISTRY), "module registered twice");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceCollision {
    #[error("module `{first}` [{first_base}, {first_end}) overlaps module `{second}` [{second_base}, {second_end})")]
    Overlap {
        first: &'static str,
        first_base: u32,
        first_end: u32,
        second: &'static str,
        second_base: u32,
        second_end: u32,
    },
    #[error("module `{0}` is registered more than once")]
    DuplicateModule(&'static str),
}

/// Looks up the base offset reserved for `module`. Usable in `const` items so a
/// module can bind its base at definition time.
pub const fn reserve(module: &str) -> Option<u32> {
    let mut i = 0;
    while i < REGISTRY.len() {
        if str_eq(REGISTRY[i].module, module) {
            return Some(REGISTRY[i].base);
        }
        i += 1;
    }
    None
}

/// Finds the module whose block contains `code`.
pub fn owner_of(code: u32) -> Option<&'static ModuleOffset> {
    REGISTRY.iter().find(|offset| offset.contains(code))
}

/// The base the next appended module must take: the first multiple of
/// `RANGE_SIZE` above every block in `table`. `None` once the code space is
/// used up.
pub fn next_base(table: &[ModuleOffset]) -> Option<u32> {
    let highest_end = table.iter().map(ModuleOffset::end).max().unwrap_or(0);
    highest_end.div_ceil(RANGE_SIZE).checked_mul(RANGE_SIZE)
}

/// Runtime form of the compile-time checks, reporting the first offending pair.
pub fn verify(table: &[ModuleOffset]) -> Result<(), NamespaceCollision> {
    for (i, first) in table.iter().enumerate() {
        for second in &table[i + 1..] {
            if first.module == second.module {
                return Err(NamespaceCollision::DuplicateModule(first.module));
            }
            if first.overlaps(second) {
                return Err(NamespaceCollision::Overlap {
                    first: first.module,
                    first_base: first.base,
                    first_end: first.end(),
                    second: second.module,
                    second_base: second.base,
                    second_end: second.end(),
                });
            }
        }
    }
    Ok(())
}

pub const fn is_disjoint(table: &[ModuleOffset]) -> bool {
    let mut i = 0;
    while i < table.len() {
        let mut j = i + 1;
        while j < table.len() {
            if table[i].overlaps(&table[j]) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

pub const fn names_unique(table: &[ModuleOffset]) -> bool {
    let mut i = 0;
    while i < table.len() {
        let mut j = i + 1;
        while j < table.len() {
            if str_eq(table[i].module, table[j].module) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MANAGEMENT_BASE: u32 = match reserve("management") {
        Some(base) => base,
        None => panic!("management has no reserved range"),
    };

    #[test]
    fn registry_ranges_are_pairwise_disjoint() {
        assert!(verify(REGISTRY).is_ok());
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in &REGISTRY[i + 1..] {
                assert!(!a.overlaps(b), "{} overlaps {}", a.module, b.module);
            }
        }
    }

    #[test]
    fn core_owns_zero_and_blocks_are_aligned() {
        assert_eq!(reserve("core"), Some(0));
        for offset in REGISTRY {
            assert_eq!(offset.base % RANGE_SIZE, 0, "{} is misaligned", offset.module);
            assert_eq!(offset.range_size, RANGE_SIZE);
        }
    }

    #[test]
    fn reserve_resolves_at_definition_time() {
        assert_eq!(MANAGEMENT_BASE, 13000);
        assert_eq!(reserve("keycloak"), Some(12000));
        assert_eq!(reserve("unknown"), None);
        assert_eq!(reserve("Core"), None);
    }

    #[test]
    fn codes_stay_inside_the_block() {
        assert_eq!(JAXRS.code(0), Some(2000));
        assert_eq!(JAXRS.code(999), Some(2999));
        assert_eq!(JAXRS.code(1000), None);
    }

    #[test]
    fn owner_of_maps_codes_back_to_modules() {
        assert_eq!(owner_of(0).map(|o| o.module), Some("core"));
        assert_eq!(owner_of(11_042).map(|o| o.module), Some("security"));
        assert_eq!(owner_of(13_999).map(|o| o.module), Some("management"));
        assert!(owner_of(14_000).is_none());
    }

    #[test]
    fn next_base_appends_after_highest_block() {
        assert_eq!(next_base(REGISTRY), Some(14000));
        assert_eq!(next_base(&[]), Some(0));
        assert_eq!(next_base(&[ModuleOffset::new("odd", 1500)]), Some(3000));
    }

    #[test]
    fn arithmetic_near_the_top_of_the_code_space_does_not_wrap() {
        let last = ModuleOffset::new("last", u32::MAX - 10);
        assert_eq!(last.end(), u32::MAX);
        assert_eq!(last.code(5), Some(u32::MAX - 5));
        assert_eq!(last.code(20), None);
        assert_eq!(next_base(&[last]), None);
    }

    #[test]
    fn verify_reports_overlap() {
        let table = [
            ModuleOffset::new("core", 0),
            ModuleOffset::new("jpa", 7000),
            ModuleOffset::new("late", 7500),
        ];
        let err = verify(&table).unwrap_err();
        assert_eq!(
            err,
            NamespaceCollision::Overlap {
                first: "jpa",
                first_base: 7000,
                first_end: 8000,
                second: "late",
                second_base: 7500,
                second_end: 8500,
            }
        );
        assert!(!is_disjoint(&table));
        assert!(err.to_string().contains("`late`"));
    }

    #[test]
    fn verify_reports_duplicate_module() {
        let table = [ModuleOffset::new("jta", 9000), ModuleOffset::new("jta", 20000)];
        assert_eq!(verify(&table), Err(NamespaceCollision::DuplicateModule("jta")));
        assert!(!names_unique(&table));
    }

    proptest! {
        #[test]
        fn appended_modules_never_collide(count in 1usize..64) {
            let mut table = REGISTRY.to_vec();
            for i in 0..count {
                let name: &'static str = Box::leak(format!("fraction-{i}").into_boxed_str());
                let base = next_base(&table).expect("code space left");
                table.push(ModuleOffset::new(name, base));
            }
            prop_assert!(verify(&table).is_ok());
            prop_assert!(is_disjoint(&table));
        }

        #[test]
        fn any_base_inside_a_block_collides(code in 0u32..14_000) {
            let mut table = REGISTRY.to_vec();
            table.push(ModuleOffset::new("intruder", code));
            let collides = matches!(verify(&table), Err(NamespaceCollision::Overlap { .. }));
            prop_assert!(collides);
        }
    }
}
