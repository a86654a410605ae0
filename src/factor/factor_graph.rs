use super::potential::{Domain, Potential};
use crate::dem::Dem;
use crate::error::{Error, Result};
use crate::estimator::MixtureModel;
use crate::graph::Graph;
use crate::types::VertexId;
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters of the factor graph potentials.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FactorOptions {
    /// Log-potential of agreeing neighbours (Potts diagonal). `>= 0`.
    pub strength: f64,
    /// Store potentials as logs instead of plain likelihoods.
    pub log_domain: bool,
    /// Add `ln w_k` to the unary of component `k`.
    pub include_mixture_weights: bool,
}

impl Default for FactorOptions {
    fn default() -> Self {
        Self {
            strength: 1.0,
            log_domain: true,
            include_mixture_weights: false,
        }
    }
}

impl FactorOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.strength.is_finite() || self.strength < 0.0 {
            return Err(Error::bad_argument(format!(
                "factor strength must be a non-negative number, got {}",
                self.strength
            )));
        }
        // The linear Potts diagonal is exp(strength) and must stay finite.
        if !self.log_domain && !self.strength.exp().is_finite() {
            return Err(Error::bad_argument(format!(
                "factor strength {} overflows the linear domain; use log_domain",
                self.strength
            )));
        }
        Ok(())
    }

    fn domain(&self) -> Domain {
        if self.log_domain {
            Domain::Log
        } else {
            Domain::Linear
        }
    }
}

/// Potts smoothness factor between variables `a` and `b`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PairwiseFactor {
    pub a: usize,
    pub b: usize,
    pub domain: Domain,
    /// `table[(s_a, s_b)]`.
    pub table: DMatrix<f64>,
}

impl PairwiseFactor {
    pub fn potts(a: usize, b: usize, num_states: usize, strength: f64, domain: Domain) -> Self {
        let (same, other) = match domain {
            Domain::Log => (strength, 0.0),
            Domain::Linear => (strength.exp(), 1.0),
        };
        let table = DMatrix::from_fn(num_states, num_states, |i, j| {
            if i == j {
                same
            } else {
                other
            }
        });
        Self {
            a,
            b,
            domain,
            table,
        }
    }

    pub fn log_table(&self) -> DMatrix<f64> {
        match self.domain {
            Domain::Log => self.table.clone(),
            Domain::Linear => self.table.map(f64::ln),
        }
    }
}

/// Discrete pairwise MRF over the valid DEM cells.
///
/// Variable `n` stands for the cell `variables[n]` and takes one of
/// `num_states` mixture labels.
#[derive(Clone, Debug, Serialize)]
pub struct FactorGraph {
    num_states: usize,
    variables: Vec<VertexId>,
    #[serde(skip)]
    index: BTreeMap<VertexId, usize>,
    unary: Vec<Potential>,
    pairwise: Vec<PairwiseFactor>,
    /// Per variable: `(pairwise factor, neighbouring variable)`.
    #[serde(skip)]
    neighbors: Vec<Vec<(usize, usize)>>,
}

impl FactorGraph {
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_factors(&self) -> usize {
        self.pairwise.len()
    }

    pub fn variables(&self) -> &[VertexId] {
        &self.variables
    }

    pub fn variable_of(&self, vertex: VertexId) -> Option<usize> {
        self.index.get(&vertex).copied()
    }

    pub fn unary(&self) -> &[Potential] {
        &self.unary
    }

    pub fn pairwise(&self) -> &[PairwiseFactor] {
        &self.pairwise
    }

    pub fn neighbors(&self, var: usize) -> &[(usize, usize)] {
        &self.neighbors[var]
    }

    /// Recomputes every unary (and the Potts tables) for a re-estimated
    /// model without touching the graph structure.
    pub fn update_node_factors(
        &mut self,
        dem: &Dem,
        model: &MixtureModel,
        options: &FactorOptions,
    ) -> Result<()> {
        options.validate()?;
        if model.num_components() != self.num_states {
            return Err(Error::bad_argument(format!(
                "model has {} components, factor graph has {} states",
                model.num_components(),
                self.num_states
            )));
        }
        let domain = options.domain();
        for (n, &vertex) in self.variables.iter().enumerate() {
            self.unary[n] = unary_potential(dem, model, vertex, options)?;
        }
        for factor in &mut self.pairwise {
            *factor =
                PairwiseFactor::potts(factor.a, factor.b, self.num_states, options.strength, domain);
        }
        Ok(())
    }
}

/// Builds one variable per graph vertex and one Potts factor per graph edge.
///
/// The unary of state `k` is `ln N(mean | φ(centre)ᵀβ_k, σ_k²)` for the cell
/// mean height at the cell centre, optionally plus `ln w_k`.
pub fn build_factor_graph(
    dem: &Dem,
    graph: &Graph,
    model: &MixtureModel,
    options: &FactorOptions,
) -> Result<FactorGraph> {
    options.validate()?;
    let num_states = model.num_components();
    if num_states == 0 {
        return Err(Error::bad_argument("mixture model has no components"));
    }
    let domain = options.domain();

    let variables: Vec<VertexId> = graph.vertices().collect();
    let index: BTreeMap<VertexId, usize> = variables
        .iter()
        .enumerate()
        .map(|(n, &v)| (v, n))
        .collect();
    let unary = variables
        .iter()
        .map(|&v| unary_potential(dem, model, v, options))
        .collect::<Result<Vec<_>>>()?;

    let mut pairwise = Vec::with_capacity(graph.num_edges());
    let mut neighbors = vec![Vec::new(); variables.len()];
    for edge in graph.edges() {
        let (a, b) = (index[&edge.u], index[&edge.v]);
        neighbors[a].push((pairwise.len(), b));
        neighbors[b].push((pairwise.len(), a));
        pairwise.push(PairwiseFactor::potts(a, b, num_states, options.strength, domain));
    }
    debug!(
        "factor graph: {} variables, {} pairwise factors, {} states",
        variables.len(),
        pairwise.len(),
        num_states
    );
    Ok(FactorGraph {
        num_states,
        variables,
        index,
        unary,
        pairwise,
        neighbors,
    })
}

fn unary_potential(
    dem: &Dem,
    model: &MixtureModel,
    vertex: VertexId,
    options: &FactorOptions,
) -> Result<Potential> {
    let cell = dem.cell_at(vertex)?;
    let mean = cell
        .mean()
        .ok_or_else(|| Error::bad_argument(format!("vertex {vertex} is an empty cell")))?;
    let centre = dem.centre_at(vertex)?;
    let log_values = model
        .components
        .iter()
        .map(|c| {
            let l = c.log_density(model.basis, centre, mean);
            if options.include_mixture_weights {
                l + c.weight.ln()
            } else {
                l
            }
        })
        .collect();
    Ok(Potential::from_log(log_values, options.domain()))
}
