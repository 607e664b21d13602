use super::*;

fn keys(manager: &TransformSetManager) -> Vec<&str> {
    manager.transforms().iter().map(|t| t.key.as_str()).collect()
}

#[test]
fn upsert_twice_with_same_value_matches_single_upsert() {
    let mut once = TransformSetManager::new();
    once.upsert("red", 40);

    let mut twice = TransformSetManager::new();
    twice.upsert("red", 40);
    twice.upsert("red", 40);

    assert_eq!(once, twice);
    assert_eq!(twice.serialize().len(), 1);
}

#[test]
fn reupserted_key_moves_to_the_end() {
    let mut manager = TransformSetManager::new();
    manager.upsert("a", 1);
    manager.upsert("b", 2);
    manager.upsert("a", 3);

    assert_eq!(
        manager.serialize(),
        vec![NamedTransform::new("b", 2), NamedTransform::new("a", 3)]
    );
}

#[test]
fn read_falls_back_to_family_defaults() {
    let mut manager = TransformSetManager::new();
    assert_eq!(
        manager.read("green", ControlFamily::Rgb),
        Some(TransformValue::Number(0))
    );
    assert_eq!(
        manager.read("brightness", ControlFamily::Hsv),
        Some(TransformValue::Number(80))
    );
    assert_eq!(manager.read("vignette", ControlFamily::Advanced), None);

    manager.upsert("green", -30);
    assert_eq!(
        manager.read("green", ControlFamily::Rgb),
        Some(TransformValue::Number(-30))
    );
}

#[test]
fn reset_keys_only_touches_named_entries() {
    let mut manager = TransformSetManager::new();
    manager.upsert("red", 10);
    manager.upsert("hue", 50);
    manager.upsert("green", 20);
    manager.upsert("blue", 30);

    manager.reset_keys(["red", "green", "blue"]);
    assert_eq!(keys(&manager), vec!["hue"]);

    manager.reset_keys(["red", "green", "blue"]);
    assert_eq!(keys(&manager), vec!["hue"]);
}

#[test]
fn reset_family_covers_advanced_filters() {
    let mut manager = TransformSetManager::new();
    manager.apply_preset("cartoon").expect("cartoon");
    manager.apply_preset("vibrance").expect("vibrance");
    manager.upsert("saturation", 10);

    manager.reset_family(ControlFamily::Advanced);
    assert_eq!(keys(&manager), vec!["saturation"]);
}

#[test]
fn rgb_presets_supersede_each_other() {
    let mut manager = TransformSetManager::new();
    manager.apply_preset("all_red").expect("all_red");
    manager.apply_preset("all_blue").expect("all_blue");

    assert_eq!(
        manager.serialize(),
        vec![
            NamedTransform::new("red", 0),
            NamedTransform::new("blue", 100),
            NamedTransform::new("green", 0),
        ]
    );
}

#[test]
fn hsv_presets_only_touch_their_keys() {
    let mut manager = TransformSetManager::new();
    manager.upsert("hue", 55);
    manager.apply_preset("grayscale").expect("grayscale");
    assert_eq!(
        manager.read("hue", ControlFamily::Hsv),
        Some(TransformValue::Number(55))
    );
    assert_eq!(
        manager.read("saturation", ControlFamily::Hsv),
        Some(TransformValue::Number(-70))
    );

    manager.apply_preset("sepia").expect("sepia");
    assert_eq!(keys(&manager), vec!["hue", "saturation"]);
    assert_eq!(
        manager.read("hue", ControlFamily::Hsv),
        Some(TransformValue::Number(20))
    );
}

#[test]
fn advanced_presets_carry_text_parameters() {
    let mut manager = TransformSetManager::new();
    manager.apply_preset("cartoon").expect("cartoon");
    manager.apply_preset("oil_painting").expect("oil");

    assert_eq!(
        manager.serialize(),
        vec![
            NamedTransform::new("cartoonify", "20:60"),
            NamedTransform::new("oil_paint", "40"),
        ]
    );
}

#[test]
fn unknown_preset_leaves_set_untouched() {
    let mut manager = TransformSetManager::new();
    manager.upsert("red", 5);

    let err = manager.apply_preset("posterize").expect_err("must fail");
    assert_eq!(err, TransformError::UnknownPreset("posterize".to_string()));
    assert_eq!(keys(&manager), vec!["red"]);
}

#[test]
fn slider_values_are_clamped_and_keys_checked() {
    let mut manager = TransformSetManager::new();
    manager.set_slider("red", 250).expect("red");
    manager.set_slider("hue", -400).expect("hue");
    assert_eq!(
        manager.serialize(),
        vec![NamedTransform::new("red", 100), NamedTransform::new("hue", -100)]
    );

    assert!(matches!(
        manager.set_slider("vignette", 10),
        Err(TransformError::UnknownControl(_))
    ));
}

#[test]
fn every_listed_preset_applies() {
    for name in preset_names() {
        let mut manager = TransformSetManager::new();
        manager.apply_preset(name).expect("listed preset");
        assert!(!manager.is_empty(), "preset {name} produced nothing");
    }
}
