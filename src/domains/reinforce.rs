//! Policy-gradient training: REINFORCE with a learned scalar baseline.
//!
//! Each episode is rolled out to completion, discounted rewards-to-go are
//! computed, and one Adam step is taken on
//!
//! ```text
//! L = −Σ_t log π(a_t|s_t)·(G_t − b̄) + mean_t (G_t − b)² − β·H
//! H = −mean_t log π(a_t|s_t)
//! ```
//!
//! where `b̄` is the baseline with gradients stopped and `β` the entropy
//! coefficient.

use ndarray::{aview1, aview_mut1, Array1, Array2, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::nn::{relu, softmax_rows, Adam, AdamConfig, Dense, DenseGrads};
use super::stats::RollingStats;
use crate::engine::rng::SimRng;
use crate::error::{McError, McResult};

// ============================================================================
// Control environments
// ============================================================================

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Observation after the step.
    pub observation: Array1<f64>,
    /// Reward for the step.
    pub reward: f64,
    /// Episode ended by the task's own termination rule.
    pub terminated: bool,
    /// Episode cut off by a step limit.
    pub truncated: bool,
}

impl StepOutcome {
    /// Whether the episode is over.
    #[must_use]
    pub const fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Episodic control task with discrete actions.
pub trait ControlEnv {
    /// Environment identifier.
    fn name(&self) -> &str;

    /// Observation vector width.
    fn observation_dim(&self) -> usize;

    /// Number of discrete actions.
    fn action_count(&self) -> usize;

    /// Start a new episode and return the first observation.
    ///
    /// # Errors
    ///
    /// Returns `Environment` if the environment was closed.
    fn reset(&mut self, rng: &mut SimRng) -> McResult<Array1<f64>>;

    /// Apply an action.
    ///
    /// # Errors
    ///
    /// Returns `Environment` for an invalid action, or a step outside a
    /// running episode.
    fn step(&mut self, action: usize) -> McResult<StepOutcome>;

    /// Release the environment.
    ///
    /// # Errors
    ///
    /// Returns `Environment` if already closed.
    fn close(&mut self) -> McResult<()>;
}

/// Classic cart-pole balancing task (Barto, Sutton & Anderson, 1983).
///
/// Observation: `[x, ẋ, θ, θ̇]`. Actions: 0 pushes left, 1 pushes right.
/// Reward 1 per step; the episode terminates when the pole tilts past 12°
/// or the cart leaves `|x| ≤ 2.4`, and is truncated at `max_steps`.
#[derive(Debug, Clone)]
pub struct CartPole {
    state: Option<[f64; 4]>,
    steps: usize,
    max_steps: usize,
    done: bool,
    closed: bool,
}

impl CartPole {
    const GRAVITY: f64 = 9.8;
    const MASS_CART: f64 = 1.0;
    const MASS_POLE: f64 = 0.1;
    const HALF_LENGTH: f64 = 0.5;
    const FORCE_MAG: f64 = 10.0;
    const TAU: f64 = 0.02;
    const X_THRESHOLD: f64 = 2.4;
    const THETA_THRESHOLD: f64 = 12.0 * 2.0 * std::f64::consts::PI / 360.0;

    /// Default episode step limit.
    pub const MAX_STEPS: usize = 500;

    /// Environment with the given step limit.
    #[must_use]
    pub const fn new(max_steps: usize) -> Self {
        Self {
            state: None,
            steps: 0,
            max_steps,
            done: false,
            closed: false,
        }
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new(Self::MAX_STEPS)
    }
}

impl ControlEnv for CartPole {
    fn name(&self) -> &str {
        "CartPole-v1"
    }

    fn observation_dim(&self) -> usize {
        4
    }

    fn action_count(&self) -> usize {
        2
    }

    fn reset(&mut self, rng: &mut SimRng) -> McResult<Array1<f64>> {
        if self.closed {
            return Err(McError::environment("reset called on a closed CartPole"));
        }
        let state = [
            rng.gen_range_f64(-0.05, 0.05),
            rng.gen_range_f64(-0.05, 0.05),
            rng.gen_range_f64(-0.05, 0.05),
            rng.gen_range_f64(-0.05, 0.05),
        ];
        self.state = Some(state);
        self.steps = 0;
        self.done = false;
        Ok(Array1::from(state.to_vec()))
    }

    fn step(&mut self, action: usize) -> McResult<StepOutcome> {
        if self.closed {
            return Err(McError::environment("step called on a closed CartPole"));
        }
        if action >= 2 {
            return Err(McError::environment(format!("invalid CartPole action {action}")));
        }
        let Some([x, x_dot, theta, theta_dot]) = self.state else {
            return Err(McError::environment("step called before reset"));
        };
        if self.done {
            return Err(McError::environment("step called after the episode ended"));
        }

        let total_mass = Self::MASS_CART + Self::MASS_POLE;
        let pole_mass_length = Self::MASS_POLE * Self::HALF_LENGTH;
        let force = if action == 1 { Self::FORCE_MAG } else { -Self::FORCE_MAG };
        let (sin_t, cos_t) = theta.sin_cos();

        let temp = (force + pole_mass_length * theta_dot * theta_dot * sin_t) / total_mass;
        let theta_acc = (Self::GRAVITY * sin_t - cos_t * temp)
            / (Self::HALF_LENGTH * (4.0 / 3.0 - Self::MASS_POLE * cos_t * cos_t / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_t / total_mass;

        let next = [
            x + Self::TAU * x_dot,
            x_dot + Self::TAU * x_acc,
            theta + Self::TAU * theta_dot,
            theta_dot + Self::TAU * theta_acc,
        ];
        self.state = Some(next);
        self.steps += 1;

        let terminated = next[0].abs() > Self::X_THRESHOLD || next[2].abs() > Self::THETA_THRESHOLD;
        let truncated = !terminated && self.steps >= self.max_steps;
        self.done = terminated || truncated;

        Ok(StepOutcome {
            observation: Array1::from(next.to_vec()),
            reward: 1.0,
            terminated,
            truncated,
        })
    }

    fn close(&mut self) -> McResult<()> {
        if self.closed {
            return Err(McError::environment("CartPole already closed"));
        }
        self.closed = true;
        self.state = None;
        Ok(())
    }
}

/// Construct an environment by name.
///
/// # Errors
///
/// Returns `Environment` for an unknown name.
pub fn make_env(name: &str, max_steps: usize) -> McResult<Box<dyn ControlEnv>> {
    match name {
        "CartPole-v1" | "cartpole" | "cart-pole" => Ok(Box::new(CartPole::new(max_steps))),
        other => Err(McError::environment(format!("unknown environment '{other}'"))),
    }
}

// ============================================================================
// Policy network
// ============================================================================

/// Two-layer softmax policy: `obs → hidden (ReLU) → actions (softmax)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyNetwork {
    fc1: Dense,
    fc2: Dense,
}

impl PolicyNetwork {
    /// Randomly initialized policy.
    #[must_use]
    pub fn new(observation_dim: usize, hidden: usize, actions: usize, rng: &mut SimRng) -> Self {
        Self {
            fc1: Dense::new(observation_dim, hidden, rng),
            fc2: Dense::new(hidden, actions, rng),
        }
    }

    /// Observation width.
    #[must_use]
    pub fn observation_dim(&self) -> usize {
        self.fc1.inputs()
    }

    /// Number of actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.fc2.outputs()
    }

    /// Hidden activations and action probabilities for a `[T, obs]` batch.
    fn forward_hidden(&self, observations: ArrayView2<'_, f64>) -> (Array2<f64>, Array2<f64>) {
        let hidden = relu(&self.fc1.forward(observations));
        let probs = softmax_rows(&self.fc2.forward(hidden.view()));
        (hidden, probs)
    }

    /// Action probabilities for one observation.
    ///
    /// # Panics
    ///
    /// Panics if the observation width differs from
    /// [`PolicyNetwork::observation_dim`]; [`PolicyNetwork::sample_action`]
    /// checks it first.
    #[must_use]
    pub fn action_probs(&self, observation: &Array1<f64>) -> Array1<f64> {
        let batch = observation.view().insert_axis(Axis(0));
        self.forward_hidden(batch).1.index_axis_move(Axis(0), 0)
    }

    /// Sample an action.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` for a wrongly sized observation, or
    /// `NonFiniteValue` when the policy output is not a distribution.
    pub fn sample_action(&self, observation: &Array1<f64>, rng: &mut SimRng) -> McResult<usize> {
        if observation.len() != self.observation_dim() {
            return Err(McError::ShapeMismatch {
                expected: format!("[{}]", self.observation_dim()),
                found: format!("[{}]", observation.len()),
            });
        }
        let probs = self.action_probs(observation);
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(McError::non_finite("policy probabilities"));
        }
        rng.sample_categorical(&probs.to_vec())
            .ok_or_else(|| McError::non_finite("empty policy output"))
    }
}

/// Discounted rewards-to-go, `G_t = r_t + γ·G_{t+1}`.
#[must_use]
pub fn discounted_returns(rewards: &[f64], gamma: f64) -> Array1<f64> {
    let mut returns = Array1::zeros(rewards.len());
    let mut running = 0.0;
    for (t, &r) in rewards.iter().enumerate().rev() {
        running = r + gamma * running;
        returns[t] = running;
    }
    returns
}

// ============================================================================
// Training
// ============================================================================

/// REINFORCE hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReinforceConfig {
    /// Environment name.
    #[validate(length(min = 1))]
    #[serde(default = "default_env")]
    pub env: String,
    /// Training episodes.
    #[validate(range(min = 1))]
    #[serde(default = "default_episodes")]
    pub episodes: usize,
    /// Discount factor.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Entropy bonus coefficient.
    #[validate(range(min = 0.0))]
    #[serde(default = "default_entropy_coef")]
    pub entropy_coef: f64,
    /// Adam learning rate.
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Hidden layer width.
    #[validate(range(min = 1))]
    #[serde(default = "default_hidden")]
    pub hidden: usize,
    /// Episode step limit.
    #[validate(range(min = 1))]
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Progress log interval in episodes.
    #[validate(range(min = 1))]
    #[serde(default = "default_log_every")]
    pub log_every: usize,
}

fn default_env() -> String {
    "CartPole-v1".to_string()
}

const fn default_episodes() -> usize {
    1000
}

const fn default_gamma() -> f64 {
    0.99
}

const fn default_entropy_coef() -> f64 {
    0.01
}

const fn default_learning_rate() -> f64 {
    1e-2
}

const fn default_hidden() -> usize {
    16
}

const fn default_max_steps() -> usize {
    CartPole::MAX_STEPS
}

const fn default_log_every() -> usize {
    100
}

impl Default for ReinforceConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            episodes: default_episodes(),
            gamma: default_gamma(),
            entropy_coef: default_entropy_coef(),
            learning_rate: default_learning_rate(),
            hidden: default_hidden(),
            max_steps: default_max_steps(),
            log_every: default_log_every(),
        }
    }
}

/// Statistics for one training episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeStats {
    /// Episode index, from 0.
    pub episode: usize,
    /// Steps taken.
    pub steps: usize,
    /// Undiscounted episode reward.
    pub total_reward: f64,
    /// Combined loss before the update.
    pub loss: f64,
    /// Baseline after the update.
    pub baseline: f64,
    /// L2 norm of the policy gradient.
    pub gradient_norm: f64,
}

/// Outcome of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Environment trained on.
    pub env: String,
    /// Per-episode statistics, in order.
    pub episodes: Vec<EpisodeStats>,
    /// Final baseline value.
    pub final_baseline: f64,
    /// Mean reward over the last 100 episodes.
    pub moving_average_reward: f64,
}

impl TrainingReport {
    /// Highest episode reward.
    #[must_use]
    pub fn best_reward(&self) -> Option<f64> {
        self.episodes
            .iter()
            .map(|e| e.total_reward)
            .max_by(f64::total_cmp)
    }
}

/// Observations and actions recorded over one episode.
#[derive(Debug, Clone)]
struct Rollout {
    /// `[T, obs]`, one row per decision.
    observations: Array2<f64>,
    actions: Vec<usize>,
    rewards: Vec<f64>,
}

/// Loss value and gradients for one episode.
#[derive(Debug, Clone)]
struct EpisodeGradients {
    loss: f64,
    fc1: DenseGrads,
    fc2: DenseGrads,
    baseline: f64,
}

/// REINFORCE-with-baseline trainer.
#[derive(Debug, Clone)]
pub struct ReinforceTrainer {
    config: ReinforceConfig,
    policy: PolicyNetwork,
    baseline: f64,
    optimizer: Adam,
}

impl ReinforceTrainer {
    /// Trainer with a fresh policy sized for the environment.
    #[must_use]
    pub fn new(config: ReinforceConfig, env: &dyn ControlEnv, rng: &mut SimRng) -> Self {
        let policy = PolicyNetwork::new(env.observation_dim(), config.hidden, env.action_count(), rng);
        let optimizer = Adam::new(AdamConfig {
            learning_rate: config.learning_rate,
            ..AdamConfig::default()
        });
        Self {
            config,
            policy,
            baseline: 0.0,
            optimizer,
        }
    }

    /// Current policy.
    #[must_use]
    pub const fn policy(&self) -> &PolicyNetwork {
        &self.policy
    }

    /// Current baseline.
    #[must_use]
    pub const fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Train for the configured number of episodes.
    ///
    /// # Errors
    ///
    /// Propagates environment failures and non-finite losses; there is no
    /// retry.
    pub fn train(&mut self, env: &mut dyn ControlEnv, rng: &mut SimRng) -> McResult<TrainingReport> {
        let mut episodes = Vec::with_capacity(self.config.episodes);
        let mut rewards = RollingStats::new(100);

        for episode in 0..self.config.episodes {
            let stats = self.run_episode(env, rng, episode)?;
            rewards.update(stats.total_reward);

            if (episode + 1) % self.config.log_every == 0 {
                tracing::info!(
                    episode = episode + 1,
                    reward = stats.total_reward,
                    avg_reward = rewards.window_mean(),
                    baseline = stats.baseline,
                    loss = stats.loss,
                    "reinforce progress"
                );
            }
            episodes.push(stats);
        }

        Ok(TrainingReport {
            env: env.name().to_string(),
            episodes,
            final_baseline: self.baseline,
            moving_average_reward: rewards.window_mean(),
        })
    }

    /// Roll out one episode and apply one update.
    ///
    /// # Errors
    ///
    /// See [`ReinforceTrainer::train`].
    pub fn run_episode(
        &mut self,
        env: &mut dyn ControlEnv,
        rng: &mut SimRng,
        episode: usize,
    ) -> McResult<EpisodeStats> {
        let rollout = self.rollout(env, rng)?;
        let returns = discounted_returns(&rollout.rewards, self.config.gamma);
        let grads = self.episode_gradients(&rollout, &returns);
        if !grads.loss.is_finite() {
            return Err(McError::non_finite(format!("reinforce loss at episode {episode}")));
        }
        let gradient_norm = (grads.fc1.norm_sq() + grads.fc2.norm_sq()).sqrt();

        let fc1 = &mut self.policy.fc1;
        let fc2 = &mut self.policy.fc2;
        self.optimizer.step(
            &mut [
                fc1.weights.view_mut().into_dyn(),
                fc1.bias.view_mut().into_dyn(),
                fc2.weights.view_mut().into_dyn(),
                fc2.bias.view_mut().into_dyn(),
                aview_mut1(std::slice::from_mut(&mut self.baseline)).into_dyn(),
            ],
            &[
                grads.fc1.weights.view().into_dyn(),
                grads.fc1.bias.view().into_dyn(),
                grads.fc2.weights.view().into_dyn(),
                grads.fc2.bias.view().into_dyn(),
                aview1(std::slice::from_ref(&grads.baseline)).into_dyn(),
            ],
        )?;

        Ok(EpisodeStats {
            episode,
            steps: rollout.actions.len(),
            total_reward: rollout.rewards.iter().sum(),
            loss: grads.loss,
            baseline: self.baseline,
            gradient_norm,
        })
    }

    /// Play one episode with the current policy.
    fn rollout(&self, env: &mut dyn ControlEnv, rng: &mut SimRng) -> McResult<Rollout> {
        let mut observation = env.reset(rng)?;
        let mut observations = Array2::zeros((0, observation.len()));
        let mut actions = Vec::new();
        let mut rewards = Vec::new();

        for _ in 0..self.config.max_steps {
            let action = self.policy.sample_action(&observation, rng)?;
            let outcome = env.step(action)?;
            observations
                .push_row(observation.view())
                .map_err(|e| McError::ShapeMismatch {
                    expected: format!("observation of width {}", observations.ncols()),
                    found: e.to_string(),
                })?;
            actions.push(action);
            rewards.push(outcome.reward);
            let done = outcome.done();
            observation = outcome.observation;
            if done {
                break;
            }
        }

        Ok(Rollout {
            observations,
            actions,
            rewards,
        })
    }

    fn episode_gradients(&self, rollout: &Rollout, returns: &Array1<f64>) -> EpisodeGradients {
        let t_len = rollout.actions.len().max(1) as f64;
        let b = self.baseline;
        let (hidden, probs) = self.policy.forward_hidden(rollout.observations.view());

        let log_probs: Array1<f64> = rollout
            .actions
            .iter()
            .enumerate()
            .map(|(t, &a)| probs[[t, a]].ln())
            .collect();
        let advantages = returns.mapv(|g| g - b);

        let pg_loss = -(&log_probs * &advantages).sum();
        let baseline_loss = advantages.mapv(|a| a * a).sum() / t_len;
        let baseline_grad = -2.0 * advantages.sum() / t_len;
        let entropy = -log_probs.sum() / t_len;

        // dL/dlogπ(a_t), then through the softmax: (onehot(a) − p).
        let mut grad_logits = -probs;
        for (t, &a) in rollout.actions.iter().enumerate() {
            grad_logits[[t, a]] += 1.0;
        }
        let coef = advantages.mapv(|a| -a + self.config.entropy_coef / t_len);
        grad_logits *= &coef.insert_axis(Axis(1));

        let mut fc2 = self.policy.fc2.zero_grads();
        let mut grad_hidden = self.policy.fc2.backward(hidden.view(), grad_logits.view(), &mut fc2);
        Zip::from(&mut grad_hidden).and(&hidden).for_each(|g, &h| {
            if h <= 0.0 {
                *g = 0.0;
            }
        });
        let mut fc1 = self.policy.fc1.zero_grads();
        self.policy.fc1.backward(rollout.observations.view(), grad_hidden.view(), &mut fc1);

        EpisodeGradients {
            loss: pg_loss + baseline_loss - self.config.entropy_coef * entropy,
            fc1,
            fc2,
            baseline: baseline_grad,
        }
    }
}

/// Train a fresh policy on the configured environment, closing it afterwards.
///
/// # Errors
///
/// Propagates any environment or training failure.
pub fn reinforce_with_baseline(
    config: &ReinforceConfig,
    rng: &mut SimRng,
) -> McResult<(PolicyNetwork, TrainingReport)> {
    let mut env = make_env(&config.env, config.max_steps)?;
    let mut trainer = ReinforceTrainer::new(config.clone(), env.as_ref(), rng);
    let report = trainer.train(env.as_mut(), rng)?;
    env.close()?;
    Ok((trainer.policy, report))
}
