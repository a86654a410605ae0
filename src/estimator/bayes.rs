use super::init::initial_model;
use super::ml::check_model;
use super::model::MixtureModel;
use super::observation::{count_distinct, Observation};
use super::options::{BayesPrior, EstimatorOptions};
use super::regression::solve_spd;
use super::{check_finite, run_em, EmReport, MixtureEstimator};
use crate::error::Result;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// Normal-Inverse-Gamma hyperparameters of one component:
/// `β | σ² ~ N(mean, σ² precision⁻¹)`, `σ² ~ InvGamma(shape, scale)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NigPosterior {
    pub mean: DVector<f64>,
    pub precision: DMatrix<f64>,
    pub shape: f64,
    pub scale: f64,
    /// Dirichlet concentration of this component's weight.
    pub concentration: f64,
}

impl NigPosterior {
    fn from_prior(prior: &BayesPrior, dim: usize) -> Self {
        Self {
            mean: DVector::zeros(dim),
            precision: DMatrix::identity(dim, dim) / prior.coeff_variance,
            shape: prior.shape,
            scale: prior.scale,
            concentration: prior.concentration,
        }
    }

    /// Mode of the inverse-gamma marginal of `σ²`.
    pub fn variance_mode(&self) -> f64 {
        self.scale / (self.shape + 1.0)
    }
}

/// Conjugate Bayesian EM with incremental batches.
///
/// After every successful [`MixtureEstimator::add_points`] the posterior is
/// kept as the prior of the next batch, and the next run starts from the
/// current point estimates so component identities carry over.
#[derive(Clone, Debug)]
pub struct BayesEstimator {
    options: EstimatorOptions,
    prior_config: BayesPrior,
    initial: Option<MixtureModel>,
    prior: Vec<NigPosterior>,
    posterior: Vec<NigPosterior>,
    model: Option<MixtureModel>,
    valid: bool,
    batches: usize,
    responsibilities: Vec<Vec<f64>>,
    report: EmReport,
}

impl BayesEstimator {
    pub fn new(options: EstimatorOptions, prior: BayesPrior) -> Result<Self> {
        options.validate()?;
        prior.validate()?;
        let configured = vec![
            NigPosterior::from_prior(&prior, options.basis.dim());
            options.num_components
        ];
        Ok(Self {
            options,
            prior_config: prior,
            initial: None,
            posterior: configured.clone(),
            prior: configured,
            model: None,
            valid: false,
            batches: 0,
            responsibilities: Vec::new(),
            report: EmReport::default(),
        })
    }

    pub fn with_initial_model(
        options: EstimatorOptions,
        prior: BayesPrior,
        initial: MixtureModel,
    ) -> Result<Self> {
        check_model(&initial, &options)?;
        let mut est = Self::new(options, prior)?;
        est.initial = Some(initial);
        Ok(est)
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    /// Prior of the next batch.
    pub fn prior(&self) -> &[NigPosterior] {
        &self.prior
    }

    /// Posterior after the last batch (equal to the prior before any batch).
    pub fn posterior(&self) -> &[NigPosterior] {
        &self.posterior
    }

    /// Batches absorbed since construction or the last reset.
    pub fn batches(&self) -> usize {
        self.batches
    }

    fn starting_model(&self, data: &[Observation]) -> MixtureModel {
        let mut model = match (&self.model, &self.initial) {
            (Some(current), _) => current.clone(),
            (None, Some(initial)) => initial.clone(),
            (None, None) => initial_model(data, &self.options),
        };
        model.normalize_weights();
        model
    }
}

/// Conjugate M-step: posterior hyperparameters from responsibility-weighted
/// sufficient statistics, then point estimates from the posterior.
fn maximize(
    prior: &[NigPosterior],
    posterior: &mut [NigPosterior],
    model: &mut MixtureModel,
    data: &[Observation],
    features: &[DVector<f64>],
    resp: &[Vec<f64>],
    floor: f64,
) {
    for (k, (p, component)) in prior.iter().zip(model.components.iter_mut()).enumerate() {
        let mut precision = p.precision.clone();
        let mut eta = &p.precision * &p.mean;
        let mut nk = 0.0;
        for ((o, phi), r) in data.iter().zip(features).zip(resp) {
            let w = r[k];
            if w <= 0.0 {
                continue;
            }
            precision.ger(w, phi, phi, 1.0);
            eta.axpy(w * o.z, phi, 1.0);
            nk += w;
        }
        let Some(mean) = solve_spd(&precision, &eta) else {
            warn!("bayes estimator: component {k} posterior precision is singular");
            continue;
        };
        let rss: f64 = data
            .iter()
            .zip(features)
            .zip(resp)
            .map(|((o, phi), r)| {
                let e = o.z - phi.dot(&mean);
                r[k] * e * e
            })
            .sum();
        let dm = &mean - &p.mean;
        let prior_term = dm.dot(&(&p.precision * &dm));
        let post = NigPosterior {
            shape: p.shape + 0.5 * nk,
            scale: p.scale + 0.5 * (rss + prior_term),
            concentration: p.concentration + nk,
            mean,
            precision,
        };
        component.coefficients = post.mean.clone();
        component.variance = post.variance_mode().max(floor);
        component.weight = post.concentration;
        posterior[k] = post;
    }
    // Dirichlet posterior mean.
    model.normalize_weights();
}

impl MixtureEstimator for BayesEstimator {
    fn add_points(&mut self, data: &[Observation]) -> Result<usize> {
        check_finite(data)?;
        let k = self.options.num_components;
        let distinct = count_distinct(data);
        if distinct < k {
            // The posterior and the last model are kept for the next batch.
            debug!("bayes estimator: {distinct} distinct samples for {k} components, invalid");
            self.valid = false;
            self.responsibilities.clear();
            self.report = EmReport::default();
            return Ok(0);
        }

        let mut model = self.starting_model(data);
        let features: Vec<DVector<f64>> = data
            .iter()
            .map(|o| self.options.basis.features(o.position))
            .collect();
        let prior = self.prior.clone();
        let mut posterior = prior.clone();
        let floor = self.options.variance_floor;
        let mut resp = Vec::new();
        let report = run_em(&mut model, data, &self.options, &mut resp, |m, r| {
            maximize(&prior, &mut posterior, m, data, &features, r, floor)
        });
        if !report.converged {
            warn!(
                "bayes estimator: no convergence after {} iterations",
                report.iterations
            );
        }
        self.batches += 1;
        debug!(
            "bayes estimator: batch {} with {} samples, {} iterations",
            self.batches,
            data.len(),
            report.iterations
        );

        let iterations = report.iterations;
        self.prior = posterior.clone();
        self.posterior = posterior;
        self.model = Some(model);
        self.responsibilities = resp;
        self.report = report;
        self.valid = true;
        Ok(iterations)
    }

    fn reset(&mut self) {
        let configured =
            NigPosterior::from_prior(&self.prior_config, self.options.basis.dim());
        self.prior = vec![configured; self.options.num_components];
        self.posterior = self.prior.clone();
        self.model = None;
        self.valid = false;
        self.batches = 0;
        self.responsibilities.clear();
        self.report = EmReport::default();
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn model(&self) -> Option<&MixtureModel> {
        self.model.as_ref().filter(|_| self.valid)
    }

    fn responsibilities(&self) -> &[Vec<f64>] {
        &self.responsibilities
    }

    fn report(&self) -> &EmReport {
        &self.report
    }
}
