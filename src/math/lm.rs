//! Levenberg–Marquardt solver for small dense nonlinear least-squares problems.
//!
//! The behavioral calibration minimizes `Σ r_i(θ)²` over an 8-dimensional
//! parameter vector with an analytic Jacobian, so a dense damped Gauss–Newton
//! iteration is the right tool:
//!
//! - build `JᵀJ` and `g = Jᵀr`
//! - solve `(JᵀJ + λ·diag(JᵀJ)) δ = -g`
//! - accept the step if the cost decreases, otherwise raise `λ` and retry
//!
//! The model's domain is open (weights and prices must stay positive, the
//! exponent inside `(0, 1)`), so the residual callback returns `None` for an
//! out-of-domain point. A trial step that leaves the domain is treated like a
//! failed step: the damping increases and the solver retries from the current
//! point. Only an out-of-domain *initial* point makes the solver itself bail
//! out (the caller surfaces that as a domain error).
//!
//! Budgets are hard caps, not errors: exhausting them returns the best point
//! found with `converged = false`.

use nalgebra::{DMatrix, DVector};

/// Damping is clamped to this range; exceeding the upper bound inside a
/// single iteration means no acceptable step exists at any useful scale.
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;

/// Stopping rules and budgets for one solver run.
#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub max_evaluations: usize,
    pub cost_tol: f64,
    pub step_tol: f64,
    pub grad_tol: f64,
    pub lambda_init: f64,
    pub lambda_scale: f64,
}

/// Solver output: the best point found plus convergence diagnostics.
#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    pub sse: f64,
    pub converged: bool,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Minimize `Σ r_i(θ)²` starting from `initial`.
///
/// `residuals` returns `None` when `θ` is outside the model domain;
/// `jacobian` is only ever called at points where `residuals` succeeded.
///
/// Returns `None` if the initial point is out of domain or yields a
/// non-finite cost.
pub fn levenberg_marquardt<R, J>(
    initial: &[f64],
    residuals: R,
    jacobian: J,
    opts: &LmOptions,
) -> Option<LmOutcome>
where
    R: Fn(&[f64]) -> Option<DVector<f64>>,
    J: Fn(&[f64]) -> DMatrix<f64>,
{
    let mut params = initial.to_vec();
    let mut r = residuals(&params)?;
    let mut evaluations = 1usize;
    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return None;
    }

    let mut lambda = opts.lambda_init;
    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < opts.max_iterations && evaluations < opts.max_evaluations {
        iterations += 1;

        let j = jacobian(&params);
        let jtj = j.transpose() * &j;
        let grad = j.transpose() * &r;

        if grad.amax() < opts.grad_tol {
            converged = true;
            break;
        }

        let mut accepted = false;
        while evaluations < opts.max_evaluations {
            let Some(step) = solve_damped(&jtj, &grad, lambda) else {
                lambda *= opts.lambda_scale;
                if lambda > LAMBDA_MAX {
                    break;
                }
                continue;
            };

            // Once damping has shrunk the proposed step to nothing, no
            // meaningful move remains: the current point is the answer.
            if step.norm() < opts.step_tol {
                converged = true;
                break;
            }

            let candidate: Vec<f64> = params.iter().zip(step.iter()).map(|(p, d)| p + d).collect();
            evaluations += 1;

            let trial = residuals(&candidate).filter(|rc| rc.norm_squared().is_finite());
            let Some(rc) = trial else {
                // Out of domain (e.g. the derived weight went negative):
                // shorten the step by raising the damping.
                lambda *= opts.lambda_scale;
                if lambda > LAMBDA_MAX {
                    break;
                }
                continue;
            };

            let sse_new = rc.norm_squared();
            if sse_new < sse {
                let improvement = sse - sse_new;
                let step_norm = step.norm();
                params = candidate;
                r = rc;
                sse = sse_new;
                lambda = (lambda / opts.lambda_scale).max(LAMBDA_MIN);
                accepted = true;
                if improvement < opts.cost_tol * (1.0 + sse) || step_norm < opts.step_tol {
                    converged = true;
                }
                break;
            }

            lambda *= opts.lambda_scale;
            if lambda > LAMBDA_MAX {
                break;
            }
        }

        if converged || !accepted {
            break;
        }
    }

    Some(LmOutcome {
        params,
        sse,
        converged,
        iterations,
        evaluations,
    })
}

/// Solve `(JᵀJ + λ·diag(JᵀJ)) δ = -g` via SVD.
///
/// SVD with progressively looser tolerances keeps the step solvable when the
/// Gauss–Newton matrix is near-singular (the calibration problem has a flat
/// direction when the data cannot separate `phi` and `alpha`).
fn solve_damped(jtj: &DMatrix<f64>, grad: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let n = jtj.nrows();
    let mut a = jtj.clone();
    for k in 0..n {
        let d = jtj[(k, k)];
        a[(k, k)] += lambda * if d > 0.0 { d } else { 1.0 };
    }

    let rhs = grad.map(|v| -v);
    let svd = a.svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(step) = svd.solve(&rhs, tol) {
            if step.iter().all(|v| v.is_finite()) {
                return Some(step);
            }
        }
    }
    None
}
