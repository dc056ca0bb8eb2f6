//! User brick lifecycle integration tests
//!
//! Covers the full definition/instance lifecycle: schema edits propagating to
//! call sites, copy semantics (shared definition, independent bindings),
//! resource aggregation through nested calls, cascading deletion, and
//! end-to-end execution of nested user brick programs.

use brickstage::bricks::{Brick, BrickKind, Motor};
use brickstage::core::types::DefinitionId;
use brickstage::formula::{Formula, FormulaElement, Sensor};
use brickstage::resources::{Resource, Resources};
use brickstage::stage::{Script, Sprite};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Set one binding of a user brick call site
fn bind(brick: &mut Brick, ordinal: usize, formula: Formula) {
    match &mut brick.kind {
        BrickKind::UserBrick(instance) => instance.bindings_mut()[ordinal] = formula,
        other => panic!("Expected user brick, got {:?}", other),
    }
}

fn binding_count(brick: &Brick) -> usize {
    match &brick.kind {
        BrickKind::UserBrick(instance) => instance.bindings().len(),
        other => panic!("Expected user brick, got {:?}", other),
    }
}

/// Sprite with one definition (`move by <v>` -> change x by v) and the
/// definition handle
fn sprite_with_move_definition() -> (Sprite, DefinitionId) {
    let mut sprite = Sprite::new("testSprite");
    let def = sprite.define_brick("move by");
    sprite.add_definition_text(def, "move by").unwrap();
    sprite.add_definition_variable(def, "v").unwrap();
    sprite
        .add_brick_to_definition(def, Brick::change_x_by(Formula::variable("v")))
        .unwrap();
    (sprite, def)
}

#[test]
fn schema_growth_propagates_to_every_instance() {
    let (mut sprite, def) = sprite_with_move_definition();

    // two call sites in two scripts, one with a non-default binding
    let mut first = sprite.instantiate(def).unwrap();
    bind(&mut first, 0, Formula::number(5.0));
    let second = sprite.instantiate(def).unwrap();

    let s0 = sprite.add_script(Script::new());
    sprite.script_mut(s0).unwrap().add_brick(first);
    let s1 = sprite.add_script(Script::new());
    sprite.script_mut(s1).unwrap().add_brick(second);

    sprite.add_definition_variable(def, "w").unwrap();

    for index in [s0, s1] {
        let brick = sprite.script(index).unwrap().brick(0).unwrap();
        assert_eq!(binding_count(brick), 2);
    }
    // prior binding unchanged, new binding freshly default-initialized
    let first = sprite.script(s0).unwrap().brick(0).unwrap();
    match &first.kind {
        BrickKind::UserBrick(instance) => {
            assert_eq!(instance.bindings()[0], Formula::number(5.0));
            assert_eq!(instance.bindings()[1], Formula::default());
        }
        _ => unreachable!(),
    }
}

#[test]
fn schema_shrink_removes_the_matching_binding() {
    let (mut sprite, def) = sprite_with_move_definition();
    sprite.add_definition_variable(def, "w").unwrap();

    let mut call = sprite.instantiate(def).unwrap();
    bind(&mut call, 0, Formula::number(1.0));
    bind(&mut call, 1, Formula::number(2.0));
    let s = sprite.add_script(Script::new());
    sprite.script_mut(s).unwrap().add_brick(call);

    // schema: [text "move by", variable "v", variable "w"]; drop "v"
    sprite.remove_definition_element(def, 1).unwrap();

    let brick = sprite.script(s).unwrap().brick(0).unwrap();
    match &brick.kind {
        BrickKind::UserBrick(instance) => {
            assert_eq!(instance.bindings(), &[Formula::number(2.0)]);
        }
        _ => unreachable!(),
    }
}

#[test]
fn copy_shares_the_definition() {
    let (mut sprite, def) = sprite_with_move_definition();
    let original = sprite.instantiate(def).unwrap();
    let copy = original.copy_for_sprite();

    let (original_def, copy_def) = match (&original.kind, &copy.kind) {
        (BrickKind::UserBrick(a), BrickKind::UserBrick(b)) => (a.definition(), b.definition()),
        _ => unreachable!(),
    };
    assert_eq!(original_def, copy_def);
    assert_ne!(original.id, copy.id);
}

#[test]
fn copy_bindings_are_independent() {
    let (mut sprite, def) = sprite_with_move_definition();
    let mut original = sprite.instantiate(def).unwrap();
    bind(&mut original, 0, Formula::number(6.0));

    let mut copy = original.copy_for_sprite();
    match &mut copy.kind {
        BrickKind::UserBrick(instance) => {
            instance.bindings_mut()[0].set_root(FormulaElement::Number(99.0));
        }
        _ => unreachable!(),
    }

    match &original.kind {
        BrickKind::UserBrick(instance) => {
            assert_eq!(instance.bindings()[0], Formula::number(6.0));
        }
        _ => unreachable!(),
    }
}

#[test]
fn empty_definition_requires_no_resources() {
    let mut sprite = Sprite::new("testSprite");
    let def = sprite.define_brick("noop");
    let call = sprite.instantiate(def).unwrap();
    assert_eq!(call.required_resources(sprite.definitions()), Resources::NONE);
}

#[test]
fn instance_resources_come_from_the_definition() {
    let mut sprite = Sprite::new("testSprite");
    let def = sprite.define_brick("stop motors");
    let motor_brick = Brick::motor_stop(Motor::A);
    let motor_resources = motor_brick.own_resources();
    assert_ne!(motor_resources, Resources::NONE);
    sprite.add_brick_to_definition(def, motor_brick).unwrap();

    let first = sprite.instantiate(def).unwrap();
    let second = sprite.instantiate(def).unwrap();

    assert_eq!(first.required_resources(sprite.definitions()), motor_resources);
    assert_eq!(
        first.required_resources(sprite.definitions()),
        second.required_resources(sprite.definitions())
    );
}

#[test]
fn sibling_instances_report_equal_resources_despite_bindings() {
    // Two call sites of one definition, one rebound to a sensor formula:
    // the sensor must not leak into the resource set, which stays a property
    // of the shared definition.
    let (mut sprite, def) = sprite_with_move_definition();

    let plain = sprite.instantiate(def).unwrap();
    let mut sensor_bound = sprite.instantiate(def).unwrap();
    bind(
        &mut sensor_bound,
        0,
        Formula::new(FormulaElement::Sensor(Sensor::Loudness)),
    );

    assert_eq!(
        plain.required_resources(sprite.definitions()),
        sensor_bound.required_resources(sprite.definitions())
    );
    assert!(!sensor_bound
        .required_resources(sprite.definitions())
        .contains(Resource::Microphone));
}

#[test]
fn resources_aggregate_through_nested_calls() {
    let mut sprite = Sprite::new("testSprite");
    let inner = sprite.define_brick("inner");
    sprite
        .add_brick_to_definition(inner, Brick::motor_stop(Motor::B))
        .unwrap();

    let outer = sprite.define_brick("outer");
    let inner_call = sprite.instantiate(inner).unwrap();
    sprite.add_brick_to_definition(outer, inner_call).unwrap();
    sprite
        .add_brick_to_definition(
            outer,
            Brick::speak(Formula::new(FormulaElement::Text("done".to_string()))),
        )
        .unwrap();

    let outer_call = sprite.instantiate(outer).unwrap();
    let script = sprite.add_script(Script::new());
    sprite.script_mut(script).unwrap().add_brick(outer_call);

    let resources = sprite.script_resources(script).unwrap();
    assert!(resources.contains(Resource::Motor));
    assert!(resources.contains(Resource::TextToSpeech));
    assert!(!resources.contains(Resource::Camera));
}

#[test]
fn deleting_a_definition_cascades_through_nesting() {
    init_tracing();
    let mut sprite = Sprite::new("testSprite");

    let outer = sprite.define_brick("outer");
    sprite.add_definition_text(outer, "outer").unwrap();
    sprite.add_definition_variable(outer, "outerBrickVariable").unwrap();

    let inner = sprite.define_brick("inner");
    sprite.add_definition_text(inner, "inner").unwrap();
    sprite.add_definition_variable(inner, "innerBrickVariable").unwrap();
    sprite
        .add_brick_to_definition(
            inner,
            Brick::change_x_by(Formula::variable("innerBrickVariable")),
        )
        .unwrap();

    // a copy of the inner call site nested inside the outer definition
    let inner_call_in_outer = sprite.instantiate(inner).unwrap();
    sprite
        .add_brick_to_definition(outer, inner_call_in_outer)
        .unwrap();

    // start script: [inner call, outer call]
    let inner_call = sprite.instantiate(inner).unwrap();
    let outer_call = sprite.instantiate(outer).unwrap();
    let outer_call_id = outer_call.id;
    let start = sprite.add_script(Script::new());
    sprite.script_mut(start).unwrap().add_brick(inner_call);
    sprite.script_mut(start).unwrap().add_brick(outer_call);

    assert_eq!(sprite.script(start).unwrap().len(), 2);
    assert_eq!(sprite.definition(outer).unwrap().script().len(), 1);

    let removed = sprite.remove_definition(inner);

    // both the standalone call and the nested one are gone
    assert_eq!(removed, 2);
    assert_eq!(sprite.script(start).unwrap().len(), 1);
    assert_eq!(sprite.script(start).unwrap().brick(0).unwrap().id, outer_call_id);
    assert_eq!(sprite.definition(outer).unwrap().script().len(), 0);

    // the outer definition itself survives
    assert!(sprite.definition(outer).is_some());
    assert!(sprite.definition(inner).is_none());
}

#[test]
fn removing_one_call_site_keeps_definition_and_siblings() {
    let (mut sprite, def) = sprite_with_move_definition();
    let first = sprite.instantiate(def).unwrap();
    let first_id = first.id;
    let second = sprite.instantiate(def).unwrap();
    let script = sprite.add_script(Script::new());
    sprite.script_mut(script).unwrap().add_brick(first);
    sprite.script_mut(script).unwrap().add_brick(second);

    assert!(sprite.remove_brick(script, first_id).is_some());

    assert_eq!(sprite.script(script).unwrap().len(), 1);
    assert!(sprite.definition(def).is_some());
}

#[test]
fn user_brick_call_moves_the_sprite() {
    // definition `move by <v>`, call site binds v = 6, execution moves x by 6
    let (mut sprite, def) = sprite_with_move_definition();
    let mut call = sprite.instantiate(def).unwrap();
    bind(&mut call, 0, Formula::number(6.0));

    let script = sprite.add_script(Script::new());
    sprite.script_mut(script).unwrap().add_brick(call);

    assert_eq!(sprite.look.position.x, 0.0);
    assert_eq!(sprite.look.position.y, 0.0);

    sprite.run_script(script).unwrap();

    assert_eq!(sprite.look.position.x, 6.0);
    assert_eq!(sprite.look.position.y, 0.0);
}

#[test]
fn nested_call_rebound_to_literal_moves_by_that_literal() {
    // Outer definition calls inner; inner's variable is bound to the outer's
    // own variable; the outer call site binds its variable to literal 0, so
    // the final delta is 0, not whatever the inner script was edited with.
    let move_value = 0.0;

    let mut sprite = Sprite::new("testSprite");

    let outer = sprite.define_brick("outer");
    sprite.add_definition_text(outer, "outer").unwrap();
    sprite.add_definition_variable(outer, "outerBrickVariable").unwrap();

    let inner = sprite.define_brick("inner");
    sprite.add_definition_text(inner, "inner").unwrap();
    sprite.add_definition_variable(inner, "innerBrickVariable").unwrap();
    sprite
        .add_brick_to_definition(
            inner,
            Brick::change_x_by(Formula::variable("innerBrickVariable")),
        )
        .unwrap();

    // inner call inside the outer body, parameter chained to the outer's own
    // variable
    let mut inner_call = sprite.instantiate(inner).unwrap();
    assert_eq!(inner_call.formulas().len(), 1);
    bind(&mut inner_call, 0, Formula::variable("outerBrickVariable"));
    sprite.add_brick_to_definition(outer, inner_call).unwrap();

    // start script calls outer with the literal
    let mut outer_call = sprite.instantiate(outer).unwrap();
    assert_eq!(outer_call.formulas().len(), 1);
    bind(&mut outer_call, 0, Formula::number(move_value));
    let start = sprite.add_script(Script::new());
    sprite.script_mut(start).unwrap().add_brick(outer_call);

    sprite.run_script(start).unwrap();

    assert_eq!(sprite.look.position.x, move_value as f32);
    assert_eq!(sprite.look.position.y, 0.0);
}

#[test]
fn nested_call_chains_values_through_frames() {
    // Same chain as above, but outer bound to 6: the value must flow
    // outer binding -> outer frame -> inner binding -> inner frame -> motion.
    let mut sprite = Sprite::new("testSprite");

    let outer = sprite.define_brick("outer");
    sprite.add_definition_variable(outer, "outerBrickVariable").unwrap();

    let inner = sprite.define_brick("inner");
    sprite.add_definition_variable(inner, "innerBrickVariable").unwrap();
    sprite
        .add_brick_to_definition(
            inner,
            Brick::change_x_by(Formula::variable("innerBrickVariable")),
        )
        .unwrap();

    let mut inner_call = sprite.instantiate(inner).unwrap();
    bind(&mut inner_call, 0, Formula::variable("outerBrickVariable"));
    sprite.add_brick_to_definition(outer, inner_call).unwrap();

    let mut outer_call = sprite.instantiate(outer).unwrap();
    bind(&mut outer_call, 0, Formula::number(6.0));
    let start = sprite.add_script(Script::new());
    sprite.script_mut(start).unwrap().add_brick(outer_call);

    sprite.run_script(start).unwrap();
    assert_eq!(sprite.look.position.x, 6.0);
}

#[test]
fn repeat_wraps_user_brick_calls() {
    let (mut sprite, def) = sprite_with_move_definition();
    let mut call = sprite.instantiate(def).unwrap();
    bind(&mut call, 0, Formula::number(2.0));

    let script = sprite.add_script(Script::new());
    sprite
        .script_mut(script)
        .unwrap()
        .add_brick(Brick::repeat(Formula::number(3.0), vec![call]));

    sprite.run_script(script).unwrap();
    assert_eq!(sprite.look.position.x, 6.0);

    // a repeat-wrapped call site is still found by the cascade
    let removed = sprite.remove_definition(def);
    assert_eq!(removed, 1);
}
