//! Property tests for the formula engine and copy semantics.

use brickstage::bricks::{Brick, BrickKind};
use brickstage::formula::{
    BinaryOp, EvalContext, Formula, FormulaElement, UnaryOp, Value,
};
use brickstage::stage::{Script, Sprite};
use proptest::prelude::*;

fn element_strategy() -> impl Strategy<Value = FormulaElement> {
    let leaf = prop_oneof![
        any::<f64>().prop_map(FormulaElement::Number),
        "[a-z]{1,8}".prop_map(FormulaElement::UserVariable),
        "[a-z]{1,8}".prop_map(FormulaElement::Text),
    ];
    leaf.prop_recursive(4, 32, 2, |inner| {
        let op = prop::sample::select(vec![
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mul,
            BinaryOp::Div,
            BinaryOp::Mod,
            BinaryOp::Gt,
            BinaryOp::Lt,
            BinaryOp::Eq,
            BinaryOp::And,
            BinaryOp::Or,
        ]);
        prop_oneof![
            (op, inner.clone(), inner.clone()).prop_map(|(op, left, right)| {
                FormulaElement::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }),
            inner.prop_map(|operand| FormulaElement::UnaryOp {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            }),
        ]
    })
}

proptest! {
    /// Evaluation is total: any tree yields a value against any (here: empty)
    /// context instead of panicking, even with unresolved names and division
    /// by arbitrary operands.
    #[test]
    fn evaluation_never_panics(root in element_strategy()) {
        let formula = Formula::new(root);
        let _ = formula.evaluate(&EvalContext::empty());
    }

    /// Comparison and logic nodes always land on exactly 0 or 1.
    #[test]
    fn comparisons_are_boolean(a in any::<f64>(), b in any::<f64>()) {
        let gt = Formula::new(FormulaElement::BinaryOp {
            op: BinaryOp::Gt,
            left: Box::new(FormulaElement::Number(a)),
            right: Box::new(FormulaElement::Number(b)),
        });
        let value = gt.evaluate(&EvalContext::empty());
        prop_assert!(value == Value::Number(0.0) || value == Value::Number(1.0));
    }

    /// Copying a user brick call site never entangles bindings: whatever the
    /// original was bound to, mutating the copy leaves it untouched, and the
    /// definition handle stays shared.
    #[test]
    fn copied_call_sites_are_independent(bound in any::<f64>(), rebound in any::<f64>()) {
        let mut sprite = Sprite::new("propSprite");
        let def = sprite.define_brick("move by");
        sprite.add_definition_variable(def, "v").unwrap();
        sprite
            .add_brick_to_definition(def, Brick::change_x_by(Formula::variable("v")))
            .unwrap();

        let mut original = sprite.instantiate(def).unwrap();
        if let BrickKind::UserBrick(instance) = &mut original.kind {
            instance.bindings_mut()[0] = Formula::number(bound);
        }

        let mut copy = original.copy_for_sprite();
        if let BrickKind::UserBrick(instance) = &mut copy.kind {
            instance.bindings_mut()[0] = Formula::number(rebound);
        }

        match (&original.kind, &copy.kind) {
            (BrickKind::UserBrick(a), BrickKind::UserBrick(b)) => {
                prop_assert_eq!(a.definition(), b.definition());
                prop_assert_eq!(&a.bindings()[0], &Formula::number(bound));
            }
            _ => prop_assert!(false, "expected user bricks"),
        }
    }

    /// Executing `move by <v>` with v bound to a finite literal moves the
    /// sprite by exactly that amount (as f32).
    #[test]
    fn bound_literal_drives_motion(delta in -1.0e6f64..1.0e6f64) {
        let mut sprite = Sprite::new("propSprite");
        let def = sprite.define_brick("move by");
        sprite.add_definition_variable(def, "v").unwrap();
        sprite
            .add_brick_to_definition(def, Brick::change_x_by(Formula::variable("v")))
            .unwrap();

        let mut call = sprite.instantiate(def).unwrap();
        if let BrickKind::UserBrick(instance) = &mut call.kind {
            instance.bindings_mut()[0] = Formula::number(delta);
        }
        let script = sprite.add_script(Script::new());
        sprite.script_mut(script).unwrap().add_brick(call);

        sprite.run_script(script).unwrap();
        prop_assert_eq!(sprite.look.position.x, delta as f32);
    }
}
