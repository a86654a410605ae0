use super::factor_graph::FactorGraph;
use super::options::{BpOptions, BpStatus, InferenceMode, Schedule};
use crate::dem::Dem;
use crate::error::Result;
use crate::numeric::{argmax, log_sum_exp, normalize_log, normalize_log_max};
use crate::types::VertexId;
use log::{debug, warn};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Final state of a BP run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BpResult {
    pub status: BpStatus,
    pub iterations: usize,
    /// Largest message change of the last iteration.
    pub max_diff: f64,
    /// Vertex id of every variable, aligned with `beliefs` and `labels`.
    pub variables: Vec<VertexId>,
    /// Normalized marginals (sum-product) or max-marginals (max-product).
    pub beliefs: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl BpResult {
    pub fn converged(&self) -> bool {
        self.status == BpStatus::Converged
    }

    pub fn label_of(&self, vertex: VertexId) -> Option<usize> {
        let n = self.variables.binary_search(&vertex).ok()?;
        self.labels.get(n).copied()
    }

    /// Writes the labels into the matching DEM cells.
    pub fn assign(&self, dem: &mut Dem) -> Result<()> {
        for (&v, &label) in self.variables.iter().zip(&self.labels) {
            dem.cell_at_mut(v)?.label = Some(label);
        }
        Ok(())
    }
}

/// Loopy belief propagation over a [`FactorGraph`].
///
/// Messages live in the log domain, one per factor and direction: message
/// `2f` flows `a → b` of factor `f`, message `2f + 1` flows `b → a`.
pub struct BeliefPropagation<'a> {
    graph: &'a FactorGraph,
    options: BpOptions,
    unary: Vec<Vec<f64>>,
    tables: Vec<DMatrix<f64>>,
    messages: Vec<Vec<f64>>,
    status: BpStatus,
    iterations: usize,
    max_diff: f64,
    rng: StdRng,
}

impl<'a> BeliefPropagation<'a> {
    pub fn new(graph: &'a FactorGraph, options: BpOptions) -> Result<Self> {
        options.validate()?;
        let rng = StdRng::seed_from_u64(options.seed);
        Ok(Self {
            graph,
            unary: graph.unary().iter().map(|p| p.log_values()).collect(),
            tables: graph.pairwise().iter().map(|f| f.log_table()).collect(),
            options,
            messages: Vec::new(),
            status: BpStatus::Uninitialized,
            iterations: 0,
            max_diff: 0.0,
            rng,
        })
    }

    pub fn status(&self) -> BpStatus {
        self.status
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn options(&self) -> &BpOptions {
        &self.options
    }

    /// Uniform messages; moves to `Running`.
    pub fn init(&mut self) {
        let k = self.graph.num_states();
        let mut uniform = vec![0.0; k];
        self.normalize(&mut uniform);
        self.messages = vec![uniform; 2 * self.graph.num_factors()];
        self.rng = StdRng::seed_from_u64(self.options.seed);
        self.iterations = 0;
        self.max_diff = 0.0;
        self.status = BpStatus::Running;
    }

    /// Back to `Uninitialized`.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.iterations = 0;
        self.max_diff = 0.0;
        self.status = BpStatus::Uninitialized;
    }

    /// Iterates until convergence or `max_num_iter`. A finished solver is not
    /// iterated again; call [`reset`](Self::reset) to start over.
    pub fn run(&mut self) -> BpResult {
        if self.status == BpStatus::Uninitialized {
            self.init();
        }
        if self.status == BpStatus::Running {
            match self.options.schedule {
                Schedule::SequentialMaxResidual => self.run_max_residual(),
                _ => self.run_sweeps(),
            }
            if self.status == BpStatus::MaxIterReached {
                warn!(
                    "BP: no convergence after {} iterations (max diff {:.3e})",
                    self.iterations, self.max_diff
                );
            } else {
                debug!(
                    "BP: converged after {} iterations ({:?}, {:?})",
                    self.iterations, self.options.schedule, self.options.mode
                );
            }
        }
        self.result()
    }

    /// Normalized belief of variable `var`, in linear scale.
    pub fn belief(&self, var: usize) -> Vec<f64> {
        let mut b = self.unary[var].clone();
        if !self.messages.is_empty() {
            for &(f, _) in self.graph.neighbors(var) {
                let incoming = &self.messages[self.incoming(f, var)];
                b.iter_mut().zip(incoming).for_each(|(x, m)| *x += m);
            }
        }
        normalize_log(&mut b);
        b.into_iter().map(f64::exp).collect()
    }

    pub fn result(&self) -> BpResult {
        let beliefs: Vec<Vec<f64>> = (0..self.graph.num_variables())
            .map(|n| self.belief(n))
            .collect();
        let labels = beliefs
            .iter()
            .map(|b| argmax(b).unwrap_or(0))
            .collect();
        BpResult {
            status: self.status,
            iterations: self.iterations,
            max_diff: self.max_diff,
            variables: self.graph.variables().to_vec(),
            beliefs,
            labels,
        }
    }

    fn run_sweeps(&mut self) {
        for iter in 1..=self.options.max_num_iter {
            let diff = match self.options.schedule {
                Schedule::Parallel => self.sweep_parallel(),
                Schedule::SequentialRandom => {
                    let mut order: Vec<usize> = (0..self.messages.len()).collect();
                    order.shuffle(&mut self.rng);
                    self.sweep_sequential(&order)
                }
                Schedule::SequentialFixed | Schedule::SequentialMaxResidual => {
                    let order: Vec<usize> = (0..self.messages.len()).collect();
                    self.sweep_sequential(&order)
                }
            };
            self.iterations = iter;
            self.max_diff = diff;
            if diff < self.options.tol || self.messages.is_empty() {
                self.status = BpStatus::Converged;
                return;
            }
        }
        self.status = BpStatus::MaxIterReached;
    }

    fn sweep_parallel(&mut self) -> f64 {
        let n = self.messages.len();
        #[cfg(feature = "parallel")]
        let fresh: Vec<Vec<f64>> = {
            let this = &*self;
            (0..n).into_par_iter().map(|m| this.candidate(m)).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let fresh: Vec<Vec<f64>> = (0..n).map(|m| self.candidate(m)).collect();

        let diff = fresh
            .iter()
            .zip(&self.messages)
            .map(|(a, b)| message_diff(a, b))
            .fold(0.0, f64::max);
        self.messages = fresh;
        diff
    }

    fn sweep_sequential(&mut self, order: &[usize]) -> f64 {
        let mut diff = 0.0f64;
        for &m in order {
            let fresh = self.candidate(m);
            diff = diff.max(message_diff(&fresh, &self.messages[m]));
            self.messages[m] = fresh;
        }
        diff
    }

    /// Residual BP: one iteration is as many single-message updates as there
    /// are messages.
    fn run_max_residual(&mut self) {
        let n = self.messages.len();
        if n == 0 {
            self.iterations = 1;
            self.max_diff = 0.0;
            self.status = BpStatus::Converged;
            return;
        }
        let mut pending: Vec<Vec<f64>> = (0..n).map(|m| self.candidate(m)).collect();
        let mut version = vec![0u64; n];
        let mut heap = BinaryHeap::with_capacity(n);
        for (m, p) in pending.iter().enumerate() {
            heap.push(Residual {
                value: message_diff(p, &self.messages[m]),
                msg: m,
                version: 0,
            });
        }

        let budget = self.options.max_num_iter * n;
        let mut updates = 0usize;
        loop {
            while heap.peek().is_some_and(|r| r.version != version[r.msg]) {
                heap.pop();
            }
            let top = heap.peek().map_or(0.0, |r| r.value);
            self.max_diff = top;
            if top < self.options.tol {
                self.status = BpStatus::Converged;
                break;
            }
            if updates >= budget {
                self.status = BpStatus::MaxIterReached;
                break;
            }
            let Some(best) = heap.pop() else {
                self.status = BpStatus::Converged;
                break;
            };
            let m = best.msg;
            self.messages[m] = pending[m].clone();
            version[m] += 1;
            updates += 1;

            // A damped update only moves part of the way; keep `m` queued
            // until it reaches its own target.
            pending[m] = self.candidate(m);
            let residual = message_diff(&pending[m], &self.messages[m]);
            if residual > 0.0 && residual >= self.options.tol {
                heap.push(Residual {
                    value: residual,
                    msg: m,
                    version: version[m],
                });
            }

            let (factor, to) = (m / 2, self.target(m));
            for &(g, _) in self.graph.neighbors(to) {
                if g == factor {
                    continue;
                }
                let out = self.outgoing(g, to);
                pending[out] = self.candidate(out);
                version[out] += 1;
                heap.push(Residual {
                    value: message_diff(&pending[out], &self.messages[out]),
                    msg: out,
                    version: version[out],
                });
            }
        }
        self.iterations = updates.div_ceil(n).max(1);
    }

    /// Recomputes message `m` from the current messages.
    fn candidate(&self, m: usize) -> Vec<f64> {
        let f = m / 2;
        let factor = &self.graph.pairwise()[f];
        let forward = m % 2 == 0;
        let from = if forward { factor.a } else { factor.b };

        let mut pre = self.unary[from].clone();
        for &(g, _) in self.graph.neighbors(from) {
            if g == f {
                continue;
            }
            let incoming = &self.messages[self.incoming(g, from)];
            pre.iter_mut().zip(incoming).for_each(|(x, v)| *x += v);
        }

        let table = &self.tables[f];
        let k = self.graph.num_states();
        let mut out = vec![0.0; k];
        let mut terms = vec![0.0; k];
        for (t, o) in out.iter_mut().enumerate() {
            for (s, term) in terms.iter_mut().enumerate() {
                let pair = if forward { table[(s, t)] } else { table[(t, s)] };
                *term = pre[s] + pair;
            }
            *o = match self.options.mode {
                InferenceMode::SumProduct => log_sum_exp(&terms),
                InferenceMode::MaxProduct => {
                    terms.iter().copied().fold(f64::NEG_INFINITY, f64::max)
                }
            };
        }
        self.normalize(&mut out);

        let d = self.options.damping;
        if d > 0.0 {
            let old = &self.messages[m];
            for (o, prev) in out.iter_mut().zip(old) {
                *o = ((1.0 - d) * o.exp() + d * prev.exp()).ln();
            }
            self.normalize(&mut out);
        }
        out
    }

    fn normalize(&self, values: &mut [f64]) {
        match self.options.mode {
            InferenceMode::SumProduct => {
                normalize_log(values);
            }
            InferenceMode::MaxProduct => {
                normalize_log_max(values);
            }
        }
    }

    /// Message flowing into `var` through factor `f`.
    fn incoming(&self, f: usize, var: usize) -> usize {
        if self.graph.pairwise()[f].b == var {
            2 * f
        } else {
            2 * f + 1
        }
    }

    /// Message flowing out of `var` through factor `f`.
    fn outgoing(&self, f: usize, var: usize) -> usize {
        if self.graph.pairwise()[f].a == var {
            2 * f
        } else {
            2 * f + 1
        }
    }

    fn target(&self, m: usize) -> usize {
        let factor = &self.graph.pairwise()[m / 2];
        if m % 2 == 0 {
            factor.b
        } else {
            factor.a
        }
    }
}

/// Largest change between two log messages, compared in linear scale.
fn message_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x.exp() - y.exp()).abs())
        .fold(0.0, f64::max)
}

#[derive(Clone, Copy, Debug)]
struct Residual {
    value: f64,
    msg: usize,
    version: u64,
}

impl PartialEq for Residual {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Residual {}

impl PartialOrd for Residual {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Residual {
    // Largest residual first; lower message index wins ties.
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| other.msg.cmp(&self.msg))
            .then_with(|| self.version.cmp(&other.version))
    }
}
