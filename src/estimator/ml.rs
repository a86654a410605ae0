use super::init::initial_model;
use super::model::MixtureModel;
use super::observation::{count_distinct, Observation};
use super::options::EstimatorOptions;
use super::regression::NormalEquationAccum;
use super::{check_finite, run_em, EmReport, MixtureEstimator};
use crate::error::{Error, Result};
use log::{debug, warn};
use nalgebra::DVector;

/// Maximum-likelihood EM for a mixture of linear regressions.
#[derive(Clone, Debug)]
pub struct MlEstimator {
    options: EstimatorOptions,
    initial: Option<MixtureModel>,
    model: Option<MixtureModel>,
    valid: bool,
    responsibilities: Vec<Vec<f64>>,
    report: EmReport,
}

impl MlEstimator {
    pub fn new(options: EstimatorOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            initial: None,
            model: None,
            valid: false,
            responsibilities: Vec::new(),
            report: EmReport::default(),
        })
    }

    /// Starts every run from `initial` instead of the segmentation regions.
    pub fn with_initial_model(options: EstimatorOptions, initial: MixtureModel) -> Result<Self> {
        check_model(&initial, &options)?;
        let mut est = Self::new(options)?;
        est.initial = Some(initial);
        Ok(est)
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    fn maximize(
        &self,
        model: &mut MixtureModel,
        data: &[Observation],
        features: &[DVector<f64>],
        resp: &[Vec<f64>],
    ) {
        let n = data.len() as f64;
        let floor = self.options.variance_floor;
        for (k, component) in model.components.iter_mut().enumerate() {
            let nk: f64 = resp.iter().map(|r| r[k]).sum();
            component.weight = nk / n;
            if nk < self.options.min_effective_count {
                debug!(
                    "ml estimator: component {k} effective count {nk:.3} below {}, keeping parameters",
                    self.options.min_effective_count
                );
                continue;
            }
            let mut accum = NormalEquationAccum::new(features[0].len());
            for ((o, phi), r) in data.iter().zip(features).zip(resp) {
                accum.accumulate(phi, o.z, r[k]);
            }
            let Some(beta) = accum.solve() else {
                warn!("ml estimator: component {k} regression has no solution, keeping parameters");
                continue;
            };
            let rss: f64 = data
                .iter()
                .zip(features)
                .zip(resp)
                .map(|((o, phi), r)| {
                    let e = o.z - phi.dot(&beta);
                    r[k] * e * e
                })
                .sum();
            component.coefficients = beta;
            component.variance = (rss / nk).max(floor);
        }
        model.normalize_weights();
    }
}

impl MixtureEstimator for MlEstimator {
    fn add_points(&mut self, data: &[Observation]) -> Result<usize> {
        check_finite(data)?;
        let k = self.options.num_components;
        let distinct = count_distinct(data);
        if distinct < k {
            debug!("ml estimator: {distinct} distinct samples for {k} components, invalid");
            self.valid = false;
            self.model = None;
            self.responsibilities.clear();
            self.report = EmReport::default();
            return Ok(0);
        }

        let mut model = match &self.initial {
            Some(m) => m.clone(),
            None => initial_model(data, &self.options),
        };
        model.normalize_weights();
        let features: Vec<DVector<f64>> = data
            .iter()
            .map(|o| self.options.basis.features(o.position))
            .collect();
        let mut resp = Vec::new();
        let report = run_em(&mut model, data, &self.options, &mut resp, |m, r| {
            self.maximize(m, data, &features, r)
        });
        if !report.converged {
            warn!(
                "ml estimator: no convergence after {} iterations",
                report.iterations
            );
        }
        debug!(
            "ml estimator: {} samples, {} iterations, log-likelihood {:?}",
            data.len(),
            report.iterations,
            report.final_log_likelihood()
        );

        let iterations = report.iterations;
        self.model = Some(model);
        self.responsibilities = resp;
        self.report = report;
        self.valid = true;
        Ok(iterations)
    }

    fn reset(&mut self) {
        self.model = None;
        self.valid = false;
        self.responsibilities.clear();
        self.report = EmReport::default();
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn model(&self) -> Option<&MixtureModel> {
        self.model.as_ref()
    }

    fn responsibilities(&self) -> &[Vec<f64>] {
        &self.responsibilities
    }

    fn report(&self) -> &EmReport {
        &self.report
    }
}

/// Shape and value checks for a caller-provided model.
pub(crate) fn check_model(model: &MixtureModel, options: &EstimatorOptions) -> Result<()> {
    if model.num_components() != options.num_components {
        return Err(Error::bad_argument(format!(
            "initial model has {} components, expected {}",
            model.num_components(),
            options.num_components
        )));
    }
    if model.basis != options.basis {
        return Err(Error::bad_argument("initial model basis differs from options"));
    }
    let dim = options.basis.dim();
    for (k, c) in model.components.iter().enumerate() {
        if c.coefficients.len() != dim {
            return Err(Error::bad_argument(format!(
                "component {k} has {} coefficients, expected {dim}",
                c.coefficients.len()
            )));
        }
        if !(c.variance > 0.0 && c.variance.is_finite()) {
            return Err(Error::bad_argument(format!(
                "component {k} variance must be positive, got {}",
                c.variance
            )));
        }
        if !(c.weight >= 0.0 && c.weight.is_finite()) {
            return Err(Error::bad_argument(format!(
                "component {k} weight must be non-negative, got {}",
                c.weight
            )));
        }
    }
    if model.components.iter().map(|c| c.weight).sum::<f64>() <= 0.0 {
        return Err(Error::bad_argument("initial model weights sum to zero"));
    }
    Ok(())
}
