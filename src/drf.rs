//! Uplift DRF
//!
//! Training entry point: validates the configuration against the frame, bins
//! the predictors, grows the forest, and computes the training metrics.
use crate::binning::bin_frame;
use crate::config::UpliftDrfParameters;
use crate::data::Frame;
use crate::divergence::UpliftGain;
use crate::errors::UpliftError;
use crate::forest::ForestBuilder;
use crate::metric::UpliftMetrics;
use crate::model::UpliftDrfModel;
use crate::sampler::RandomSampler;
use crate::splitter::UpliftSplitter;
use crate::validation::validate;
use log::info;
use std::time::Instant;

/// Uplift distributed random forest trainer.
#[derive(Debug, Clone)]
pub struct UpliftDrf {
    parameters: UpliftDrfParameters,
}

impl UpliftDrf {
    pub fn new(parameters: UpliftDrfParameters) -> Self {
        UpliftDrf { parameters }
    }

    pub fn parameters(&self) -> &UpliftDrfParameters {
        &self.parameters
    }

    /// Train a model on a frame.
    ///
    /// * `frame` - Training frame, holding the predictors, the treatment column and the response column.
    pub fn train_model(&self, frame: &Frame) -> Result<UpliftDrfModel, UpliftError> {
        let params = &self.parameters;
        let schema = validate(params, frame)?;
        let start = Instant::now();
        info!(
            "Training {} uplift trees on {} rows, {} predictors, treatment {}, response {}.",
            params.ntrees,
            frame.num_rows(),
            schema.n_predictors(),
            schema.treatment_column,
            schema.response_column
        );

        let data = bin_frame(frame, &schema, params.nbins, params.nbins_cats);
        let splitter = UpliftSplitter::new(
            UpliftGain::new(params.uplift_metric),
            params.min_rows,
            params.min_split_improvement,
        );
        let sampler = RandomSampler::new(params.sample_rate);
        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(num_threads) = params.num_threads {
            pool = pool.num_threads(num_threads);
        }
        let pool = pool.build().map_err(|e| UpliftError::Internal(e.to_string()))?;

        let trees = ForestBuilder {
            data: &data,
            splitter: &splitter,
            sampler: &sampler,
            params,
            pool: &pool,
        }
        .build()?;

        let model = UpliftDrfModel::new(params.clone(), schema, trees);
        let rows = pool.install(|| model.predict(frame))?;
        let uplift: Vec<f64> = rows.iter().map(|r| r.uplift_predict).collect();
        let metrics = UpliftMetrics::calculate(
            &uplift,
            &data.treatment,
            &data.response,
            params.auuc_type,
            params.auuc_nbins,
        );
        info!(
            "Finished training in {:.2}s, ATE {:.4}, AUUC ({:?}) {:.4}.",
            start.elapsed().as_secs_f64(),
            metrics.ate,
            metrics.auuc_type,
            metrics.auuc
        );
        Ok(model.set_training_metrics(metrics))
    }
}

/// Train an uplift forest on a frame.
pub fn train(parameters: &UpliftDrfParameters, frame: &Frame) -> Result<UpliftDrfModel, UpliftError> {
    UpliftDrf::new(parameters.clone()).train_model(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuucType, ImportanceMethod, UpliftMetricType};
    use crate::constants::PREDICTION_COLUMNS;
    use crate::data::Column;
    use crate::errors::ValidationFailure;
    use crate::testing::{small_frame, uplift_frame};
    use std::fs;

    const TREATMENT: [&str; 10] = ["T", "C", "T", "C", "T", "C", "C", "C", "C", "C"];
    const CONVERSION: [&str; 10] = ["1", "0", "1", "1", "1", "0", "0", "1", "0", "1"];

    fn small_params() -> UpliftDrfParameters {
        UpliftDrfParameters::new("conversion", "treatment")
            .set_ntrees(4)
            .set_max_depth(5)
            .set_min_rows(1)
            .set_seed(1234)
    }

    #[test]
    fn test_basic_train() {
        let frame = small_frame(&TREATMENT, &CONVERSION);
        let model = train(&small_params(), &frame).unwrap();
        assert_eq!(model.ntrees(), 4);

        let scored = model.score(&frame).unwrap();
        assert_eq!(scored.num_rows(), frame.num_rows());
        assert_eq!(scored.names(), PREDICTION_COLUMNS.to_vec());
        for row in model.predict(&frame).unwrap() {
            assert!((0.0..=1.0).contains(&row.p_y1_ct1));
            assert!((0.0..=1.0).contains(&row.p_y1_ct0));
            assert!((row.uplift_predict - (row.p_y1_ct1 - row.p_y1_ct0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_missing_treatment() {
        let frame = Frame::new(vec![
            Column::numeric("C0", (0..10).map(|v| v as f64).collect()),
            Column::from_labels("conversion", &CONVERSION),
        ])
        .unwrap();
        let err = train(&small_params(), &frame).unwrap_err();
        assert!(err.is_configuration());
        assert!(err
            .failures()
            .contains(&ValidationFailure::TreatmentColumnNotFound("treatment".to_string())));
        assert!(err
            .failures()
            .iter()
            .all(|f| f.to_string().starts_with("treatment column required")));
    }

    #[test]
    fn test_ten_row_fixture() {
        let treatment = ["T", "C", "T", "T", "T", "C", "C", "C", "C", "C"];
        let conversion = ["1", "0", "1", "0", "1", "0", "1", "0", "1", "1"];
        let frame = small_frame(&treatment, &conversion);
        let model = train(&UpliftDrfParameters::new("conversion", "treatment"), &frame).unwrap();
        assert_eq!(model.ntrees(), 50);
        let scored = model.score(&frame).unwrap();
        assert_eq!(scored.num_rows(), 10);
        assert_eq!(scored.names(), PREDICTION_COLUMNS.to_vec());
    }

    #[test]
    fn test_single_treated_row() {
        let treatment = ["T", "C", "C", "C", "C", "C", "C", "C", "C", "C"];
        let conversion = ["1", "0", "1", "0", "1", "0", "1", "0", "0", "1"];
        let frame = small_frame(&treatment, &conversion);
        let params = UpliftDrfParameters::new("conversion", "treatment").set_seed(0xDECAF);
        let model = train(&params, &frame).unwrap();
        // Roots sampled without the treated row use the rate over the whole frame.
        assert!(model
            .trees()
            .iter()
            .any(|t| t.nodes[0].counts.n_t == 0));
        for tree in model.trees() {
            assert_eq!(tree.nodes[0].p_y1_ct1, 1.0);
        }
        for row in model.predict(&frame).unwrap() {
            assert_eq!(row.p_y1_ct1, 1.0);
        }
    }

    #[test]
    fn test_multiple_treatment_groups() {
        let treatment = ["T", "C", "T2", "C", "T", "C", "C", "C", "C", "C"];
        let frame = small_frame(&treatment, &CONVERSION);
        let err = train(&small_params(), &frame).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.failures().contains(&ValidationFailure::MultipleTreatmentGroups(3)));
    }

    #[test]
    fn test_numeric_treatment() {
        let mut frame = small_frame(&TREATMENT, &CONVERSION);
        frame = Frame::new(
            frame
                .columns()
                .iter()
                .map(|c| {
                    if c.name == "treatment" {
                        Column::numeric("treatment", vec![1., 0., 1., 0., 1., 0., 0., 0., 0., 0.])
                    } else {
                        c.clone()
                    }
                })
                .collect(),
        )
        .unwrap();
        let err = train(&small_params(), &frame).unwrap_err();
        assert!(err.failures().contains(&ValidationFailure::TreatmentNotCategorical));

        // Converting the column makes it a valid treatment.
        frame.to_categorical_col("treatment").unwrap();
        assert!(train(&small_params(), &frame).is_ok());
    }

    #[test]
    fn test_multinomial_response() {
        let conversion = ["1", "0", "2", "1", "1", "0", "0", "1", "0", "2"];
        let frame = small_frame(&TREATMENT, &conversion);
        let err = train(&small_params(), &frame).unwrap_err();
        assert!(err.failures().contains(&ValidationFailure::MultinomialResponse(3)));
    }

    #[test]
    fn test_same_seed_same_forest() {
        let frame = uplift_frame(1500, 3);
        let params = UpliftDrfParameters::new("conversion", "treatment")
            .set_ntrees(6)
            .set_mtries(-1)
            .set_seed(99);
        let a = train(&params, &frame).unwrap();
        let b = train(&params.clone().set_num_threads(Some(1)), &frame).unwrap();
        assert_eq!(a.trees(), b.trees());
        assert_eq!(a.score(&frame).unwrap(), b.score(&frame).unwrap());

        let c = train(&params.clone().set_seed(100), &frame).unwrap();
        assert_ne!(a.trees(), c.trees());
    }

    #[test]
    fn test_training_metrics() {
        let frame = uplift_frame(3000, 5);
        for metric in [
            UpliftMetricType::KL,
            UpliftMetricType::Euclidean,
            UpliftMetricType::ChiSquared,
        ] {
            let params = UpliftDrfParameters::new("conversion", "treatment")
                .set_ntrees(10)
                .set_max_depth(6)
                .set_min_rows(30)
                .set_uplift_metric(metric)
                .set_auuc_type(AuucType::Gain)
                .set_seed(7);
            let model = train(&params, &frame).unwrap();
            let metrics = model.training_metrics().unwrap();
            assert!(metrics.ate.is_finite());
            assert!(metrics.att.is_finite());
            assert!(metrics.atc.is_finite());
            assert!(metrics.auuc.is_finite());
            assert_eq!(metrics.auuc, metrics.gain);
            // True effect is 0.5 on half of the rows.
            assert!(metrics.ate > 0.1 && metrics.ate < 0.4, "{:?}", metrics);
            assert!(metrics.qini > 0.0);

            // Rows with C0 < 0.5 get a larger uplift.
            let rows = model.predict(&frame).unwrap();
            let c0 = frame.column("C0").unwrap().to_f64();
            let (mut low, mut high) = (0.0, 0.0);
            for (r, x) in rows.iter().zip(c0.iter()) {
                if *x < 0.5 {
                    low += r.uplift_predict;
                } else {
                    high += r.uplift_predict;
                }
            }
            assert!(low > high);

            let importance = model.calculate_feature_importance(ImportanceMethod::TotalGain, true);
            assert!(importance.keys().all(|k| ["C0", "C1", "segment"].contains(&k.as_str())));
            // Every tree splits on C0 first.
            assert!(model.trees().iter().all(|t| t.nodes[0].split_feature == 0));
        }
    }

    #[test]
    fn test_score_without_predictor() {
        let frame = uplift_frame(1000, 8);
        let params = UpliftDrfParameters::new("conversion", "treatment")
            .set_ntrees(3)
            .set_min_rows(20)
            .set_seed(8);
        let model = train(&params, &frame).unwrap();
        assert!(model.required_predictors().contains(&"C0"));
        let without = Frame::new(
            frame
                .columns()
                .iter()
                .filter(|c| c.name != "C0")
                .cloned()
                .collect(),
        )
        .unwrap();
        assert!(matches!(model.score(&without), Err(UpliftError::SchemaMismatch(_))));
    }

    #[test]
    fn test_ignored_columns() {
        let frame = uplift_frame(800, 4);
        let params = UpliftDrfParameters::new("conversion", "treatment")
            .set_ntrees(2)
            .set_ignored_columns(&["C0", "segment"])
            .set_seed(4);
        let model = train(&params, &frame).unwrap();
        assert_eq!(model.schema().predictor_names(), vec!["C1"]);
    }

    #[test]
    fn test_save_and_load() {
        let frame = uplift_frame(600, 2);
        let params = UpliftDrfParameters::new("conversion", "treatment")
            .set_ntrees(3)
            .set_seed(2);
        let model = train(&params, &frame).unwrap();
        let path = std::env::temp_dir().join("uplift_forest_save_and_load.json");
        let path = path.to_str().unwrap();
        model.save_model(path).unwrap();
        let loaded = UpliftDrfModel::load_model(path).unwrap();
        fs::remove_file(path).unwrap();
        assert_eq!(loaded.trees(), model.trees());
        assert_eq!(loaded.parameters(), model.parameters());
        assert_eq!(loaded.training_metrics(), model.training_metrics());
        assert_eq!(loaded.score(&frame).unwrap(), model.score(&frame).unwrap());
    }
}
