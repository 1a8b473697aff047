use enumset::EnumSet;
use varform_ir::{GeometricQuantity as Q, Side};

use crate::config::{LoweringConfig, RestrictionConfig, parse_preserve_list};
use crate::test::helpers::count_warnings;

#[test]
fn test_lowering_builder_defaults_to_empty_preserve() {
    let config = LoweringConfig::builder().build();
    assert!(config.preserve.is_empty());
    assert_eq!(config, LoweringConfig::default());
}

#[test]
fn test_lowering_builder_sets_preserve() {
    let config = LoweringConfig::builder().preserve(Q::Jacobian | Q::FacetNormal).build();
    assert_eq!(config.preserve, Q::Jacobian | Q::FacetNormal);
}

#[test]
fn test_parse_preserve_list() {
    let (set, warnings) = count_warnings(|| parse_preserve_list("jacobian, cell_volume,bogus"));
    assert_eq!(set, Q::Jacobian | Q::CellVolume);
    assert_eq!(warnings, 1);
}

#[test]
fn test_parse_empty_preserve_list() {
    assert_eq!(parse_preserve_list(""), EnumSet::empty());
    assert_eq!(parse_preserve_list(" , ,"), EnumSet::empty());
}

#[test]
fn test_restriction_defaults() {
    let config = RestrictionConfig::default();
    assert!(config.use_default_side);
    assert_eq!(config.default_side, Side::Plus);
    assert_eq!(RestrictionConfig::builder().build(), config);
}

#[test]
fn test_restriction_builder_overrides() {
    let config = RestrictionConfig::builder().use_default_side(false).default_side(Side::Minus).build();
    assert!(!config.use_default_side);
    assert_eq!(config.default_side, Side::Minus);
}

#[test]
fn test_from_env() {
    const VARS: [&str; 3] = ["VARFORM_PRESERVE_GEOMETRY", "VARFORM_DEFAULT_SIDE", "VARFORM_NO_DEFAULT_SIDE"];
    // Only this test touches the VARFORM_* variables.
    unsafe {
        std::env::set_var("VARFORM_PRESERVE_GEOMETRY", "jacobian,cell_volume");
        std::env::set_var("VARFORM_DEFAULT_SIDE", " - ");
        std::env::remove_var("VARFORM_NO_DEFAULT_SIDE");
    }
    assert_eq!(LoweringConfig::from_env().preserve, Q::Jacobian | Q::CellVolume);
    let restriction = RestrictionConfig::from_env();
    assert_eq!(restriction.default_side, Side::Minus);
    assert!(restriction.use_default_side);

    unsafe { std::env::set_var("VARFORM_NO_DEFAULT_SIDE", "1") };
    assert!(!RestrictionConfig::from_env().use_default_side);

    unsafe {
        for var in VARS {
            std::env::remove_var(var);
        }
    }
    assert!(LoweringConfig::from_env().preserve.is_empty());
    assert_eq!(RestrictionConfig::from_env(), RestrictionConfig::default());
}
