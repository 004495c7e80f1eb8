use approx::{assert_abs_diff_eq, assert_relative_eq};
use ferrite_mlp::optim::{optimized_update, CoefState, LrDecay, Optimizer, UpdateParams};

fn params(optimizer: Optimizer) -> UpdateParams {
    UpdateParams {
        optimizer,
        learning_rate: 0.1,
        momentum: 0.9,
        window: 0.9,
        optimizer_bias: 1e-7,
        iteration: 1,
        l1: 0.0,
        l2: 0.0,
        decay: 0.0,
    }
}

#[test]
fn plain_step_follows_the_gradient() {
    let mut coef = 1.0;
    let mut state = CoefState::default();
    optimized_update(&mut coef, &mut state, 0.5, &params(Optimizer::None));
    assert_relative_eq!(coef, 1.05);
}

#[test]
fn momentum_accumulates_velocity() {
    let mut coef = 0.0;
    let mut state = CoefState::default();
    let p = params(Optimizer::Momentum);
    optimized_update(&mut coef, &mut state, 1.0, &p);
    assert_relative_eq!(coef, 0.1);
    optimized_update(&mut coef, &mut state, 1.0, &p);
    assert_relative_eq!(coef, 0.1 + 0.19);
}

#[test]
fn nesterov_looks_ahead() {
    let mut coef = 0.0;
    let mut state = CoefState::default();
    optimized_update(&mut coef, &mut state, 1.0, &params(Optimizer::Nesterov));
    // velocity 0.1, step 0.9 * 0.1 + 0.1
    assert_relative_eq!(coef, 0.19);
    assert_relative_eq!(state.previous_update, 0.1);
}

#[test]
fn adam_first_step_is_the_learning_rate() {
    let mut coef = 0.0;
    let mut state = CoefState::default();
    optimized_update(&mut coef, &mut state, -3.0, &params(Optimizer::Adam));
    assert_abs_diff_eq!(coef, -0.1, epsilon = 1e-6);
}

#[test]
fn amsgrad_keeps_the_largest_second_moment() {
    let mut coef = 0.0;
    let mut state = CoefState::default();
    let mut p = params(Optimizer::Amsgrad);
    optimized_update(&mut coef, &mut state, 10.0, &p);
    let peak = state.optimal_previous_grad2;
    for iteration in 2..20 {
        p.iteration = iteration;
        optimized_update(&mut coef, &mut state, 0.01, &p);
        assert_eq!(state.optimal_previous_grad2, peak);
        assert!(state.previous_grad2 < peak);
    }
}

#[test]
fn adaptive_kinds_move_with_the_gradient() {
    for optimizer in [Optimizer::Rmsprop, Optimizer::Adadelta, Optimizer::Amsgrad, Optimizer::Nadam] {
        let mut coef = 0.0;
        let mut state = CoefState::default();
        optimized_update(&mut coef, &mut state, 2.0, &params(optimizer));
        assert!(coef > 0.0, "{optimizer:?}");
        let mut coef = 0.0;
        let mut state = CoefState::default();
        optimized_update(&mut coef, &mut state, -2.0, &params(optimizer));
        assert!(coef < 0.0, "{optimizer:?}");
    }
}

#[test]
fn penalties_shrink_weights_but_not_biases() {
    let p = UpdateParams { l1: 0.1, l2: 0.5, ..params(Optimizer::None) };
    let mut coef = 1.0;
    optimized_update(&mut coef, &mut CoefState::default(), 0.0, &p);
    assert_relative_eq!(coef, 1.0 - 0.1 * (0.5 + 0.1));

    let mut bias = 1.0;
    optimized_update(&mut bias, &mut CoefState::default(), 0.0, &p.without_penalty());
    assert_eq!(bias, 1.0);
}

#[test]
fn weight_decay_is_decoupled() {
    let p = UpdateParams { decay: 0.1, ..params(Optimizer::Adam) };
    let mut coef = 1.0;
    optimized_update(&mut coef, &mut CoefState::default(), 0.0, &p);
    assert_relative_eq!(coef, 0.99);
}

#[test]
fn decay_schedules() {
    assert_eq!(LrDecay::None.compute(0.1, 10, 0.1, 5), 0.1);
    assert_relative_eq!(LrDecay::Inverse.compute(0.1, 10, 0.1, 5), 0.05);
    assert_relative_eq!(LrDecay::Exp.compute(0.1, 10, 0.1, 5), 0.1 * (-1f64).exp());
    assert_relative_eq!(LrDecay::Step.compute(0.1, 25, 0.5, 10), 0.025);
    assert_relative_eq!(LrDecay::Step.compute(0.1, 9, 0.5, 10), 0.1);
}
