use super::params::{EstimatorKind, FitInput, PipelineParams};
use crate::dem::Dem;
use crate::diagnostics::{
    elapsed_ms, DemStage, DetectionReport, EstimationStage, GraphStage, InferenceStage,
    InputDescriptor, PipelineTrace, SegmentationStage,
};
use crate::error::{Error, Result};
use crate::estimator::{
    observations_from_cells, observations_from_points, BayesEstimator, MixtureEstimator,
    MlEstimator,
};
use crate::factor::{build_factor_graph, BeliefPropagation};
use crate::graph::build_graph;
use crate::segment::segment_graph;
use crate::types::{DetectionSummary, Point};
use log::debug;
use std::time::Instant;

/// Curb detector running DEM → graph → segmentation → mixture estimate →
/// BP labeling on one point cloud per [`process`](Self::process) call.
///
/// The estimator persists across calls: the Bayesian variant keeps its
/// posterior as the prior of the next cloud until [`reset`](Self::reset).
pub struct CurbDetector {
    params: PipelineParams,
    estimator: Box<dyn MixtureEstimator + Send>,
}

impl CurbDetector {
    pub fn new(params: PipelineParams) -> Result<Self> {
        params.validate()?;
        let estimator = make_estimator(&params)?;
        Ok(Self { params, estimator })
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub fn estimator(&self) -> &dyn MixtureEstimator {
        self.estimator.as_ref()
    }

    /// Forgets everything the estimator accumulated.
    pub fn reset(&mut self) {
        self.estimator.reset();
    }

    /// Runs every stage on `points`.
    ///
    /// Only argument problems are errors. An estimator left invalid (too few
    /// distinct samples) skips the labeling stage and is reported in the
    /// summary; BP non-convergence is reported through its status.
    pub fn process(&mut self, points: &[Point]) -> Result<DetectionReport> {
        let total_start = Instant::now();
        let params = &self.params;
        let mut trace = PipelineTrace {
            input: InputDescriptor {
                num_points: points.len(),
                auto_bounds: params.bounds.is_none(),
            },
            ..Default::default()
        };

        // DEM
        let start = Instant::now();
        let (minimum, maximum) = match params.bounds {
            Some(b) => (b.minimum, b.maximum),
            None => Dem::bounds_of(points, params.margin).ok_or_else(|| {
                Error::bad_argument("cannot derive a DEM extent from an empty cloud")
            })?,
        };
        let (mut dem, mapping) = Dem::from_points(
            points,
            minimum,
            maximum,
            params.resolution,
            params.dem.clone(),
        )?;
        let ms = elapsed_ms(start);
        trace.timings.push("dem", ms);
        trace.dem = Some(DemStage::describe(&dem, mapping.outside, ms));

        // Graph
        let start = Instant::now();
        let graph = build_graph(&dem, &params.graph);
        let ms = elapsed_ms(start);
        trace.timings.push("graph", ms);
        trace.graph = Some(GraphStage::describe(&graph, ms));

        // Segmentation
        let start = Instant::now();
        let segmentation = segment_graph(&graph, &params.segmentation)?;
        let ms = elapsed_ms(start);
        trace.timings.push("segmentation", ms);
        trace.segmentation = Some(SegmentationStage::describe(
            &segmentation,
            params.segmentation.k,
            ms,
        ));

        // Estimation
        let start = Instant::now();
        let data = match params.fit_on {
            FitInput::Points => observations_from_points(points, &mapping, &dem, &segmentation)?,
            FitInput::Cells => observations_from_cells(&dem, &segmentation),
        };
        self.estimator.add_points(&data)?;
        let valid = self.estimator.is_valid();
        let ms = elapsed_ms(start);
        trace.timings.push("estimation", ms);
        trace.estimation = Some(EstimationStage {
            estimator: match self.params.estimator {
                EstimatorKind::Ml => "ml".to_string(),
                EstimatorKind::Bayes => "bayes".to_string(),
            },
            observations: data.len(),
            valid,
            em: self.estimator.report().clone(),
            elapsed_ms: ms,
        });
        let model = if valid {
            self.estimator.model().cloned()
        } else {
            None
        };

        // Labeling
        let mut labeling = None;
        if let Some(model) = &model {
            let start = Instant::now();
            for (v, r) in model.cell_responsibilities(&dem) {
                dem.cell_at_mut(v)?.responsibilities = Some(r);
            }
            let factors = build_factor_graph(&dem, &graph, model, &self.params.factor)?;
            let mut bp = BeliefPropagation::new(&factors, self.params.bp.clone())?;
            let result = bp.run();
            result.assign(&mut dem)?;
            let ms = elapsed_ms(start);
            trace.timings.push("labeling", ms);
            trace.inference = Some(InferenceStage::describe(&factors, &result, ms));
            labeling = Some(result);
        } else {
            debug!(
                "pipeline: estimator invalid on {} samples, labeling skipped",
                data.len()
            );
        }

        trace.timings.total_ms = elapsed_ms(total_start);
        let summary = DetectionSummary {
            num_points: points.len(),
            valid_cells: dem.num_valid(),
            edges: graph.num_edges(),
            regions: segmentation.num_components(),
            estimator_valid: valid,
            em_iterations: self.estimator.report().iterations,
            bp_iterations: labeling.as_ref().map_or(0, |r| r.iterations),
            bp_converged: labeling.as_ref().is_some_and(|r| r.converged()),
            latency_ms: trace.timings.total_ms,
        };
        debug!(
            "pipeline: {} points, {} valid cells, {} regions, estimator valid={}, {:.3} ms",
            summary.num_points,
            summary.valid_cells,
            summary.regions,
            summary.estimator_valid,
            summary.latency_ms
        );

        Ok(DetectionReport {
            summary,
            dem,
            segmentation,
            model,
            labeling,
            trace,
        })
    }
}

fn make_estimator(params: &PipelineParams) -> Result<Box<dyn MixtureEstimator + Send>> {
    let options = params.estimator_options.clone();
    Ok(match params.estimator {
        EstimatorKind::Ml => Box::new(MlEstimator::new(options)?),
        EstimatorKind::Bayes => Box::new(BayesEstimator::new(options, params.bayes_prior.clone())?),
    })
}
