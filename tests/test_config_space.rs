//! Integration test: configuration spaces, conditions, forbidden clauses, updates

use autonet::config_space::{
    Condition, Configuration, ConfigurationSpace, ForbiddenClause, Hyperparameter, HyperparameterSearchSpaceUpdates,
    HyperparameterValue, ValueRange, CHOICE_KEY,
};
use autonet::error::AutoNetError;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn conditional_space() -> ConfigurationSpace {
    let mut space = ConfigurationSpace::new();
    space
        .add_hyperparameter(
            Hyperparameter::categorical("kind", ["linear", "tree"])
                .unwrap()
                .with_default("linear")
                .unwrap(),
        )
        .unwrap();
    space
        .add_hyperparameter(Hyperparameter::float("alpha", 1e-4, 1.0, true).unwrap())
        .unwrap();
    space
        .add_hyperparameter(Hyperparameter::integer("depth", 1, 8, false).unwrap())
        .unwrap();
    space.add_condition(Condition::equals("alpha", "kind", "linear")).unwrap();
    space.add_condition(Condition::equals("depth", "kind", "tree")).unwrap();
    space
}

#[test]
fn test_default_respects_conditions() {
    let space = conditional_space();
    let default = space.get_default_configuration();
    assert!(default.contains("alpha"));
    assert!(!default.contains("depth"));
    space.check_configuration(&default).unwrap();
}

#[test]
fn test_sampled_configurations_are_valid() {
    let space = conditional_space();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    for config in space.sample_configurations(&mut rng, 50).unwrap() {
        space.check_configuration(&config).unwrap();
        let kind = config.string("kind").unwrap();
        assert_eq!(config.contains("alpha"), kind == "linear");
        assert_eq!(config.contains("depth"), kind == "tree");
    }
}

#[test]
fn test_sampling_is_deterministic_per_seed() {
    let space = conditional_space();
    let a = space
        .sample_configurations(&mut Xoshiro256PlusPlus::seed_from_u64(11), 10)
        .unwrap();
    let b = space
        .sample_configurations(&mut Xoshiro256PlusPlus::seed_from_u64(11), 10)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_inactive_value_is_rejected() {
    let space = conditional_space();
    let config = space.get_default_configuration().with("depth", 3i64);
    assert!(space.check_configuration(&config).is_err());
}

#[test]
fn test_forbidden_clause_filters_samples() {
    let mut space = ConfigurationSpace::new();
    space
        .add_hyperparameter(
            Hyperparameter::categorical("a", ["x", "y"]).unwrap().with_default("x").unwrap(),
        )
        .unwrap();
    space
        .add_hyperparameter(
            Hyperparameter::categorical("b", ["p", "q"]).unwrap().with_default("p").unwrap(),
        )
        .unwrap();
    space
        .add_forbidden_clause(ForbiddenClause::and(vec![
            ForbiddenClause::equals("a", "y"),
            ForbiddenClause::equals("b", "q"),
        ]))
        .unwrap();

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
    for config in space.sample_configurations(&mut rng, 40).unwrap() {
        let forbidden = config.string("a").unwrap() == "y" && config.string("b").unwrap() == "q";
        assert!(!forbidden);
    }

    let bad = Configuration::new().with("a", "y").with("b", "q");
    assert!(space.check_configuration(&bad).is_err());
}

#[test]
fn test_forbidden_clause_against_default_leaves_space_unchanged() {
    let mut space = ConfigurationSpace::new();
    space
        .add_hyperparameter(
            Hyperparameter::categorical("a", ["x", "y"]).unwrap().with_default("x").unwrap(),
        )
        .unwrap();
    let err = space.add_forbidden_clause(ForbiddenClause::equals("a", "x")).unwrap_err();
    assert!(matches!(err, AutoNetError::Configuration(_)));
    assert!(space.forbidden_clauses().is_empty());

    space.set_default_value("a", HyperparameterValue::from("y")).unwrap();
    space.add_forbidden_clause(ForbiddenClause::equals("a", "x")).unwrap();
    assert!(space.set_default_value("a", HyperparameterValue::from("x")).is_err());
    assert_eq!(space.get_default_configuration().string("a").unwrap(), "y");
}

#[test]
fn test_nested_space_prefixes_and_conditions() {
    let mut child = ConfigurationSpace::new();
    child
        .add_hyperparameter(Hyperparameter::integer("units", 8, 64, true).unwrap())
        .unwrap();

    let mut parent = ConfigurationSpace::new();
    parent
        .add_hyperparameter(
            Hyperparameter::categorical(CHOICE_KEY, ["Small", "Large"])
                .unwrap()
                .with_default("Small")
                .unwrap(),
        )
        .unwrap();
    parent
        .add_configuration_space("Large", &child, Some((CHOICE_KEY, HyperparameterValue::from("Large"))))
        .unwrap();

    let mut joint = ConfigurationSpace::new();
    joint.add_configuration_space("backbone", &parent, None).unwrap();
    assert!(joint.contains("backbone:__choice__"));
    assert!(joint.contains("backbone:Large:units"));

    let default = joint.get_default_configuration();
    assert!(!default.contains("backbone:Large:units"));

    let large = Configuration::new()
        .with("backbone:__choice__", "Large")
        .with("backbone:Large:units", 16i64);
    joint.check_configuration(&large).unwrap();
    let projected = large.sub_configuration("backbone");
    assert_eq!(projected.string(CHOICE_KEY).unwrap(), "Large");
    assert_eq!(projected.int("Large:units").unwrap(), 16);
}

#[test]
fn test_missing_typed_value() {
    let err = Configuration::new().float("lr").unwrap_err();
    assert!(matches!(err, AutoNetError::MissingHyperparameter(_)));
}

#[test]
fn test_updates_json_round_trip() {
    let mut updates = HyperparameterSearchSpaceUpdates::new();
    updates
        .append(
            "network_backbone",
            "MLPBackbone:num_units",
            ValueRange::Int { lower: 16, upper: 32 },
            16i64,
            true,
        )
        .append(
            "encoder",
            CHOICE_KEY,
            ValueRange::Choices(vec!["OneHotEncoder".into()]),
            "OneHotEncoder",
            false,
        );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("updates.json");
    updates.save(&path).unwrap();
    let loaded = HyperparameterSearchSpaceUpdates::load(&path).unwrap();
    assert_eq!(loaded, updates);
    assert_eq!(loaded.for_node("encoder").names().count(), 1);
}
