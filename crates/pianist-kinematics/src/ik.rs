//! IK solver adapter with two interchangeable strategies.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector, Matrix6xX, Vector3, Vector6};
use pianist_ir::Side;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::KinematicsError;
use crate::joints::JointType;
use crate::limb::{Limb, ResolvedLimb};
use crate::physics::{Configuration, Kinematics};
use crate::qp::solve_box_qp;
use crate::targets::HandTargets;

/// Parameters of the task-space QP strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QpParams {
    /// Weight on the three positional residuals.
    pub position_cost: f64,
    /// Weight on the three orientation residuals. Small but non-zero keeps
    /// the problem well posed although only position is targeted.
    pub orientation_cost: f64,
    /// Levenberg-Marquardt damping scaled by each task's squared weighted error.
    pub lm_damping: f64,
    /// Constant damping on every joint. Selects the minimum-norm velocity
    /// among near-equal-cost solutions of the redundant arm; must be positive.
    pub damping: f64,
    /// Keep joints inside their ranges.
    pub use_limits: bool,
}

impl Default for QpParams {
    fn default() -> Self {
        Self {
            position_cost: 100.0,
            orientation_cost: 0.5,
            lm_damping: 5.0,
            damping: 10.0,
            use_limits: false,
        }
    }
}

/// Parameters of the per-joint axis projection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    /// Gain applied to each joint's projected error.
    pub gain: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self { gain: 1.0 }
    }
}

/// IK backend, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum IkStrategy {
    /// Damped task-space QP over all controlled joints.
    Qp(QpParams),
    /// Steer each joint along its axis by the part of the positional error
    /// it lines up with. Cheap and dependency-free, but a decoupled
    /// approximation rather than a true Jacobian transpose.
    JacobianProjection(ProjectionParams),
}

impl Default for IkStrategy {
    fn default() -> Self {
        IkStrategy::Qp(QpParams::default())
    }
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct IkSolution {
    /// Dense joint velocity over the full configuration.
    pub velocity: DVector<f64>,
    /// Limbs whose entries were recomputed this solve.
    pub solved: Vec<ResolvedLimb>,
    /// Limbs that were skipped and kept their previous entries.
    pub skipped: Vec<Side>,
}

/// Turns per-limb targets into a joint velocity command.
///
/// The solver has no side effects: it reads the physics state and returns a
/// velocity; writing happens elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct IkSolver {
    strategy: IkStrategy,
    prefixes: Vec<String>,
}

impl IkSolver {
    /// Create a solver, validating the strategy parameters.
    pub fn new(strategy: IkStrategy, prefixes: Vec<String>) -> Result<Self, KinematicsError> {
        match &strategy {
            IkStrategy::Qp(p) => {
                KinematicsError::require_positive("damping", p.damping)?;
                KinematicsError::require_positive("position_cost", p.position_cost)?;
                KinematicsError::require_positive("orientation_cost", p.orientation_cost)?;
                if !(p.lm_damping >= 0.0) {
                    return Err(KinematicsError::InvalidParameter {
                        name: "lm_damping",
                        reason: format!("must be non-negative, got {}", p.lm_damping),
                    });
                }
            }
            IkStrategy::JacobianProjection(p) => {
                KinematicsError::require_positive("gain", p.gain)?;
            }
        }
        Ok(Self { strategy, prefixes })
    }

    /// Active strategy.
    pub fn strategy(&self) -> &IkStrategy {
        &self.strategy
    }

    /// Name prefixes tried during resolution.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Solve for a joint velocity that moves each effector toward its target.
    ///
    /// `previous` is the last velocity command (same length as the
    /// configuration); entries of limbs that cannot be resolved, and every
    /// entry after a numerical failure, are returned unchanged from it.
    pub fn solve<K: Kinematics + ?Sized>(
        &self,
        physics: &K,
        limbs: &[Limb],
        targets: &HandTargets,
        previous: &DVector<f64>,
        dt: f64,
    ) -> IkSolution {
        let configuration = Configuration::from_physics(physics);
        let mut velocity = if previous.len() == configuration.len() {
            previous.clone()
        } else {
            DVector::zeros(configuration.len())
        };

        let mut solved = Vec::with_capacity(limbs.len());
        let mut skipped = Vec::new();
        for limb in limbs {
            match limb.resolve(physics, &self.prefixes) {
                Some(resolved) => solved.push(resolved),
                None => skipped.push(limb.side()),
            }
        }

        if solved.is_empty() || dt <= 0.0 {
            return IkSolution {
                velocity,
                solved: Vec::new(),
                skipped,
            };
        }

        let ok = match &self.strategy {
            IkStrategy::Qp(params) => {
                solve_qp(physics, &configuration, &solved, targets, params, dt, &mut velocity)
            }
            IkStrategy::JacobianProjection(params) => {
                solve_projection(physics, &configuration, &solved, targets, params, dt, &mut velocity)
            }
        };

        if !ok {
            warn!("IK solve failed numerically, holding previous command");
            let velocity = if previous.len() == configuration.len() {
                previous.clone()
            } else {
                DVector::zeros(configuration.len())
            };
            skipped.extend(solved.iter().map(|l| l.side));
            return IkSolution {
                velocity,
                solved: Vec::new(),
                skipped,
            };
        }

        IkSolution {
            velocity,
            solved,
            skipped,
        }
    }
}

/// Geometric Jacobian (angular rows 0..3, linear rows 3..6) of one limb's
/// effector with respect to that limb's joints.
fn limb_jacobian<K: Kinematics + ?Sized>(physics: &K, limb: &ResolvedLimb) -> Matrix6xX<f64> {
    let effector = physics.frame_pose(limb.effector).translation.vector;
    let mut jac = Matrix6xX::zeros(limb.joints.len());
    for (col, &joint) in limb.joints.iter().enumerate() {
        let axis = physics.joint_axis(joint);
        let (angular, linear) = match physics.joint_type(joint) {
            JointType::Hinge => (axis, axis.cross(&(effector - physics.joint_anchor(joint).coords))),
            JointType::Slide => (Vector3::zeros(), axis),
        };
        jac.fixed_view_mut::<3, 1>(0, col).copy_from(&angular);
        jac.fixed_view_mut::<3, 1>(3, col).copy_from(&linear);
    }
    jac
}

/// Pose error (angular rows 0..3, linear rows 3..6) from effector to target.
fn pose_error<K: Kinematics + ?Sized>(
    physics: &K,
    limb: &ResolvedLimb,
    targets: &HandTargets,
) -> Vector6<f64> {
    let current = physics.frame_pose(limb.effector);
    let target = targets.pose(limb.side);
    let rotation = (target.orientation * current.rotation.inverse()).scaled_axis();
    let position = target.position.coords - current.translation.vector;
    Vector6::new(
        rotation.x, rotation.y, rotation.z, position.x, position.y, position.z,
    )
}

fn solve_qp<K: Kinematics + ?Sized>(
    physics: &K,
    configuration: &Configuration,
    limbs: &[ResolvedLimb],
    targets: &HandTargets,
    params: &QpParams,
    dt: f64,
    velocity: &mut DVector<f64>,
) -> bool {
    // Columns: every joint of every solved limb, in limb order.
    let mut columns = Vec::new();
    let mut column_of = HashMap::new();
    for limb in limbs {
        for &joint in &limb.joints {
            column_of.entry(joint).or_insert_with(|| {
                columns.push(joint);
                columns.len() - 1
            });
        }
    }
    let n = columns.len();

    let weights = Vector6::new(
        params.orientation_cost,
        params.orientation_cost,
        params.orientation_cost,
        params.position_cost,
        params.position_cost,
        params.position_cost,
    );

    let mut h = DMatrix::<f64>::identity(n, n) * params.damping;
    let mut g = DVector::<f64>::zeros(n);

    for limb in limbs {
        let jac = limb_jacobian(physics, limb);
        let error = pose_error(physics, limb, targets);

        let weighted_error = error.component_mul(&weights);
        let mut weighted_jac = jac;
        for (row, w) in weights.iter().enumerate() {
            weighted_jac.row_mut(row).scale_mut(*w);
        }

        let mu = params.lm_damping * weighted_error.norm_squared();
        let jtj = weighted_jac.transpose() * &weighted_jac;
        let jte = weighted_jac.transpose() * weighted_error;

        for (a, joint_a) in limb.joints.iter().enumerate() {
            let ca = column_of[joint_a];
            g[ca] += jte[a];
            for (b, joint_b) in limb.joints.iter().enumerate() {
                h[(ca, column_of[joint_b])] += jtj[(a, b)];
            }
        }
        for i in 0..n {
            h[(i, i)] += mu;
        }

        debug!(
            limb = %limb.side,
            position_error = error.fixed_rows::<3>(3).norm(),
            "qp task"
        );
    }

    let bounds: Option<Vec<(f64, f64)>> = params.use_limits.then(|| {
        columns
            .iter()
            .map(|&joint| match physics.joint_range(joint) {
                Some((lo, hi)) => {
                    let q = configuration.get(joint);
                    ((lo - q).min(0.0), (hi - q).max(0.0))
                }
                None => (f64::NEG_INFINITY, f64::INFINITY),
            })
            .collect()
    });

    let Some(dq) = solve_box_qp(&h, &g, bounds.as_deref()) else {
        return false;
    };

    for (col, &joint) in columns.iter().enumerate() {
        velocity[joint.0] = dq[col] / dt;
    }
    debug!(velocity_norm = (&dq / dt).norm(), "qp solved");
    true
}

fn solve_projection<K: Kinematics + ?Sized>(
    physics: &K,
    configuration: &Configuration,
    limbs: &[ResolvedLimb],
    targets: &HandTargets,
    params: &ProjectionParams,
    dt: f64,
    velocity: &mut DVector<f64>,
) -> bool {
    for limb in limbs {
        let effector = physics.frame_pose(limb.effector).translation.vector;
        let error = targets.get(limb.side).coords - effector;

        for &joint in &limb.joints {
            let mut v = params.gain * error.dot(&physics.joint_axis(joint));
            if let Some((lo, hi)) = physics.joint_range(joint) {
                let q = configuration.get(joint);
                let next = (q + v * dt).clamp(lo.min(q), hi.max(q));
                v = (next - q) / dt;
            }
            if !v.is_finite() {
                return false;
            }
            velocity[joint.0] = v;
        }
        debug!(limb = %limb.side, position_error = error.norm(), "projection step");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KinematicModel;
    use crate::targets::TargetTracker;
    use nalgebra::{Isometry3, Point3};
    use pianist_ir::{presets, Articulation, BodyDef, JointDef, JointKind, LimbSpec, Vec3};

    const SOLVE_DT: f64 = 0.1;

    fn g1() -> KinematicModel {
        KinematicModel::from_articulation(&presets::g1_arms(Vec3::new(0.8, 0.0, 0.85))).unwrap()
    }

    fn limbs() -> Vec<Limb> {
        vec![
            Limb::new(presets::g1_limb(Side::Right)),
            Limb::new(presets::g1_limb(Side::Left)),
        ]
    }

    fn targets() -> HandTargets {
        TargetTracker::default().get_targets(
            &Isometry3::translation(0.4, -0.15, 0.89),
            &Isometry3::translation(0.4, 0.15, 0.89),
        )
    }

    fn effector_error(model: &KinematicModel, side: Side, targets: &HandTargets) -> f64 {
        let frame = model.resolve_frame(&presets::g1_limb(side).effector).unwrap();
        (Point3::from(model.frame_pose(frame).translation.vector) - targets.get(side)).norm()
    }

    /// Solve, integrate the configuration and write it back, `iterations` times.
    fn run(model: &mut KinematicModel, solver: &IkSolver, iterations: usize) -> Vec<f64> {
        let limbs = limbs();
        let targets = targets();
        let mut previous = DVector::zeros(model.num_joints());
        let mut errors = vec![effector_error(model, Side::Right, &targets)];
        for _ in 0..iterations {
            let solution = solver.solve(&*model, &limbs, &targets, &previous, SOLVE_DT);
            let mut config = Configuration::from_physics(&*model);
            config.integrate_inplace(&solution.velocity, SOLVE_DT);
            model.set_configuration(config.q().as_slice());
            previous = solution.velocity;
            errors.push(effector_error(model, Side::Right, &targets));
        }
        errors
    }

    #[test]
    fn zero_damping_rejected() {
        let strategy = IkStrategy::Qp(QpParams {
            damping: 0.0,
            ..QpParams::default()
        });
        assert!(IkSolver::new(strategy, vec![]).is_err());
    }

    #[test]
    fn qp_converges_on_stationary_target() {
        let mut model = g1();
        let solver = IkSolver::new(IkStrategy::default(), vec![String::new()]).unwrap();
        let errors = run(&mut model, &solver, 300);

        // Strictly decreasing, or already inside a small band around the target.
        for pair in errors.windows(2) {
            assert!(pair[1] < pair[0] || pair[1] < 1e-3, "error grew: {pair:?}");
        }
        assert!(errors[0] > 0.1);
        assert!(*errors.last().unwrap() < 0.01, "final error {}", errors.last().unwrap());
        assert!(effector_error(&model, Side::Left, &targets()) < 0.01);
    }

    #[test]
    fn qp_respects_limits_when_enabled() {
        let mut model = g1();
        let strategy = IkStrategy::Qp(QpParams {
            use_limits: true,
            ..QpParams::default()
        });
        let solver = IkSolver::new(strategy, vec![String::new()]).unwrap();
        run(&mut model, &solver, 100);
        for i in 0..model.num_joints() {
            let joint = crate::physics::JointId(i);
            let (lo, hi) = model.joint_range(joint).unwrap();
            let q = model.joint_position(joint);
            assert!(q >= lo - 1e-9 && q <= hi + 1e-9);
        }
    }

    fn gantry() -> (KinematicModel, Limb) {
        let slide = |axis: Vec3| JointKind::Slide {
            axis,
            range: Some((-1.0, 1.0)),
        };
        let body = |name: &str, parent: Option<&str>, position: Vec3| BodyDef {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            position,
        };
        let joint = |name: &str, body: &str, kind: JointKind| JointDef {
            name: name.to_string(),
            body: body.to_string(),
            kind,
        };
        let art = Articulation {
            bodies: vec![
                body("carriage_x", None, Vec3::new(0.0, 0.0, 1.0)),
                body("carriage_y", Some("carriage_x"), Vec3::zeros()),
                body("tool", Some("carriage_y"), Vec3::zeros()),
            ],
            joints: vec![
                joint("x", "carriage_x", slide(Vec3::new(1.0, 0.0, 0.0))),
                joint("y", "carriage_y", slide(Vec3::new(0.0, 1.0, 0.0))),
                joint("z", "tool", slide(Vec3::new(0.0, 0.0, 1.0))),
            ],
        };
        let limb = Limb::new(LimbSpec {
            side: Side::Right,
            joints: vec!["x".into(), "y".into(), "z".into()],
            bodies: vec!["carriage_x".into(), "carriage_y".into(), "tool".into()],
            effector: "tool".into(),
        });
        (KinematicModel::from_articulation(&art).unwrap(), limb)
    }

    #[test]
    fn projection_converges_on_stationary_target() {
        let (mut model, limb) = gantry();
        let limbs = vec![limb];
        let target = Point3::new(0.3, 0.2, 0.9);
        let targets = HandTargets {
            left: Point3::origin(),
            right: target,
        };
        let strategy = IkStrategy::JacobianProjection(ProjectionParams { gain: 1.0 });
        let solver = IkSolver::new(strategy, vec![]).unwrap();
        let tool = model.resolve_frame("tool").unwrap();

        let mut previous = DVector::zeros(3);
        let mut last = f64::INFINITY;
        for _ in 0..100 {
            let solution = solver.solve(&model, &limbs, &targets, &previous, SOLVE_DT);
            let mut config = Configuration::from_physics(&model);
            config.integrate_inplace(&solution.velocity, SOLVE_DT);
            model.set_configuration(config.q().as_slice());
            previous = solution.velocity;

            let error = (Point3::from(model.frame_pose(tool).translation.vector) - target).norm();
            assert!(error < last);
            last = error;
        }
        assert!(last < 1e-3);
    }

    #[test]
    fn projection_clips_to_joint_range() {
        let (model, limb) = gantry();
        let targets = HandTargets {
            left: Point3::origin(),
            right: Point3::new(5.0, 0.0, 1.0),
        };
        let strategy = IkStrategy::JacobianProjection(ProjectionParams { gain: 100.0 });
        let solver = IkSolver::new(strategy, vec![]).unwrap();
        let solution = solver.solve(&model, &[limb], &targets, &DVector::zeros(3), SOLVE_DT);

        // q + v * dt lands exactly on the upper limit of the x slide.
        assert!((solution.velocity[0] * SOLVE_DT - 1.0).abs() < 1e-9);
    }

    #[test]
    fn projection_runs_on_g1() {
        let model = g1();
        let strategy = IkStrategy::JacobianProjection(ProjectionParams::default());
        let solver = IkSolver::new(strategy, vec![String::new()]).unwrap();
        let solution = solver.solve(&model, &limbs(), &targets(), &DVector::zeros(14), SOLVE_DT);
        assert_eq!(solution.solved.len(), 2);
        assert!(solution.velocity.iter().all(|v| v.is_finite()));
        assert!(solution.velocity.norm() > 0.0);
    }

    #[test]
    fn unresolved_limb_keeps_previous_entries() {
        let model = g1();
        let mut spec = presets::g1_limb(Side::Left);
        spec.effector = "left_hand_palm_link".to_string();
        let limbs = vec![Limb::new(presets::g1_limb(Side::Right)), Limb::new(spec)];
        let solver = IkSolver::new(IkStrategy::default(), vec![String::new()]).unwrap();

        let previous = DVector::from_element(model.num_joints(), 0.25);
        let solution = solver.solve(&model, &limbs, &targets(), &previous, SOLVE_DT);

        assert_eq!(solution.skipped, vec![Side::Left]);
        for name in presets::g1_arm_joints(Side::Left) {
            let joint = model.resolve_joint(&name).unwrap();
            assert_eq!(solution.velocity[joint.0], 0.25);
        }
        let moved = presets::g1_arm_joints(Side::Right)
            .iter()
            .any(|name| solution.velocity[model.resolve_joint(name).unwrap().0] != 0.25);
        assert!(moved);
    }
}
