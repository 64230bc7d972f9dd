//! Inference Service - Core business logic
//!
//! Runs the classification flow, single-stage prediction and the two-stage
//! vehicle / license plate cascade, persisting results through the record
//! store.

use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use ndarray::Array3;
use tracing::{debug, info, warn};

use crate::engine::{
    decoder::{decode, DetectionResult, InferenceResult},
    preprocess::{crop_to_box, decode_base64, decode_image, image_to_tensor, preprocess},
    registry::{ModelConfig, ModelConfigRegistry, ModelType, OutputKind},
    ModelPool, NamedTensors,
};
use crate::error::{PipelineError, Result};
use crate::storage::{InferenceRecord, ResultStorage};
use crate::utils::image::encode_base64_png;

use super::cancel::CancelSignal;
use super::types::*;

/// Inference service
pub struct InferenceService<S: ResultStorage> {
    registry: Arc<ModelConfigRegistry>,
    pool: Arc<ModelPool>,
    storage: Arc<S>,
}

impl<S: ResultStorage> InferenceService<S> {
    /// Create a new inference service
    pub fn new(registry: Arc<ModelConfigRegistry>, pool: Arc<ModelPool>, storage: Arc<S>) -> Self {
        Self {
            registry,
            pool,
            storage,
        }
    }

    /// Get a reference to the storage
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Classify an image and persist the outcome
    pub async fn classify(&self, request: InferenceRequest, cancel: &CancelSignal) -> Result<ClassifyResult> {
        let start = Instant::now();
        let config = self.registry.resolve(request.model_type)?;
        if config.output != OutputKind::Classification {
            return Err(PipelineError::Configuration(format!(
                "Model {} does not produce classification output",
                request.model_type
            )));
        }

        let encoded = request.image_data.clone();
        let result = self
            .run_model(request.model_type, cancel, move |config| {
                preprocess(&encoded, config.input_width, config.input_height, config.normalization)
            })
            .await?;
        let InferenceResult::Classification(classification) = result else {
            return Err(PipelineError::Configuration(format!(
                "Model {} does not produce classification output",
                request.model_type
            )));
        };

        let record = self
            .persist(InferenceRecord::classification(
                request.model_type,
                Some(request.image_data),
                &classification,
            ), cancel)
            .await?;

        let inference_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Classified image as {} in {}ms (record {})",
            classification.predicted_class(),
            inference_time_ms,
            record.id
        );

        Ok(ClassifyResult {
            record_id: record.id,
            predicted_class: classification.predicted_class().to_string(),
            probability_scores: classification.probability_scores,
            inference_time_ms,
        })
    }

    /// Run one model over an image without persisting anything.
    ///
    /// Detection boxes are returned in source-image pixels.
    pub async fn predict(&self, request: InferenceRequest, cancel: &CancelSignal) -> Result<InferenceResult> {
        let config = self.registry.resolve(request.model_type)?.clone();
        let image = Arc::new(load_image(&request.image_data)?);
        let source = image.dimensions();

        let result = self.run_image(request.model_type, image, cancel).await?;
        Ok(match result {
            InferenceResult::Detection(detection) => {
                InferenceResult::Detection(to_source_space(detection, &config, source))
            }
            classification => classification,
        })
    }

    /// Vehicle detection followed by license plate detection on the vehicle crop.
    ///
    /// Stage 1 is persisted once a vehicle is found; stage 2 only when a
    /// plate is found as well.
    pub async fn detect_cascade(&self, request: InferenceRequest, cancel: &CancelSignal) -> Result<CascadeOutcome> {
        if request.model_type != ModelType::VehicleDetection {
            return Err(PipelineError::InputValidation(format!(
                "Detection cascade starts from {}, got {}",
                ModelType::VehicleDetection,
                request.model_type
            )));
        }

        let vehicle_config = self.registry.resolve(ModelType::VehicleDetection)?.clone();
        let plate_config = self.registry.resolve(ModelType::LicensePlateDetection)?.clone();

        let image = Arc::new(load_image(&request.image_data)?);
        let (width, height) = image.dimensions();

        // Stage 1
        let stage1 = detection_of(
            ModelType::VehicleDetection,
            self.run_image(ModelType::VehicleDetection, image.clone(), cancel).await?,
        )?;
        let vehicle = to_source_space(stage1, &vehicle_config, (width, height));
        // A box clamped to nothing lies outside the image
        let Some(vehicle_box) = vehicle.bbox.filter(|b| b.area() > 0.0) else {
            info!("No vehicle present");
            return Ok(CascadeOutcome::NoVehiclePresent);
        };

        let vehicle_record = self
            .persist(InferenceRecord::detection(
                ModelType::VehicleDetection,
                Some(request.image_data),
                &vehicle,
            ), cancel)
            .await?;
        debug!("Vehicle at {:?} (record {})", vehicle.bbox, vehicle_record.id);

        // Stage 2 runs on the vehicle crop
        let (crop, region) = crop_to_box(&image, &vehicle_box);
        let crop = Arc::new(crop);

        let stage2 = detection_of(
            ModelType::LicensePlateDetection,
            self.run_image(ModelType::LicensePlateDetection, crop.clone(), cancel).await?,
        )?;

        let mut plate = None;
        let mut plate_record_id = None;
        if !stage2.is_empty() {
            let mut detection = to_source_space(stage2, &plate_config, (region.width, region.height));
            detection.bbox = detection
                .bbox
                .map(|b| b.translate(region.x as f32, region.y as f32).clamp_to(width, height));

            let crop_data = encode_base64_png(&crop).map_err(PipelineError::storage)?;
            let record = self
                .persist(InferenceRecord::detection(
                    ModelType::LicensePlateDetection,
                    Some(crop_data),
                    &detection,
                ), cancel)
                .await?;
            debug!("License plate at {:?} (record {})", detection.bbox, record.id);

            plate = Some(detection);
            plate_record_id = Some(record.id);
        } else {
            info!("No license plate found on vehicle {}", vehicle_record.id);
        }

        Ok(CascadeOutcome::Detected(CascadeResult {
            vehicle_detection: vehicle,
            vehicle_record_id: vehicle_record.id,
            license_plate_detection: plate,
            license_plate_record_id: plate_record_id,
        }))
    }

    /// Get service health
    pub fn health(&self) -> HealthResult {
        let models_loaded = self
            .pool
            .get_status(self.registry.model_types())
            .into_iter()
            .map(|(model_type, loaded)| (model_type.to_string(), loaded))
            .collect();

        HealthResult {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            models_loaded,
        }
    }

    async fn run_image(
        &self,
        model_type: ModelType,
        image: Arc<DynamicImage>,
        cancel: &CancelSignal,
    ) -> Result<InferenceResult> {
        self.run_model(model_type, cancel, move |config| {
            image_to_tensor(&image, config.input_width, config.input_height, config.normalization)
        })
        .await
    }

    /// Preprocess, infer and decode one stage on the blocking pool.
    ///
    /// The stage is raced against `cancel`; a cancelled stage yields
    /// `Cancelled` even if the engine call has already finished.
    async fn run_model<F>(&self, model_type: ModelType, cancel: &CancelSignal, build_input: F) -> Result<InferenceResult>
    where
        F: FnOnce(&ModelConfig) -> Result<Array3<f32>> + Send + 'static,
    {
        let config = self.registry.resolve(model_type)?.clone();
        cancel.check()?;

        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<InferenceResult> {
            let tensor = build_input(&config)?;
            let input_name = config.primary_input()?.to_string();

            let model = pool
                .get_model(model_type, &config.artifact_path)
                .map_err(|e| PipelineError::engine(format!("Failed to load {} model", model_type), e))?;

            let mut inputs = NamedTensors::new();
            inputs.insert(input_name, tensor.into_dyn());
            let outputs = model
                .run(&inputs)
                .map_err(|e| PipelineError::engine(format!("Inference failed for {}", model_type), e))?;

            decode(&outputs, &config)
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Inference for {} cancelled", model_type);
                Err(PipelineError::Cancelled)
            }
            joined = task => joined
                .map_err(|e| PipelineError::engine("Inference task failed", e.into()))?,
        }
    }

    async fn persist(&self, record: InferenceRecord, cancel: &CancelSignal) -> Result<InferenceRecord> {
        cancel.check()?;
        self.storage.add(record).await.map_err(PipelineError::storage)
    }
}

fn load_image(encoded: &str) -> Result<DynamicImage> {
    decode_image(&decode_base64(encoded)?)
}

fn detection_of(model_type: ModelType, result: InferenceResult) -> Result<DetectionResult> {
    match result {
        InferenceResult::Detection(detection) => Ok(detection),
        InferenceResult::Classification(_) => Err(PipelineError::Configuration(format!(
            "Model {} does not produce detection output",
            model_type
        ))),
    }
}

/// Map the box into source pixels and clamp it to the source bounds
fn to_source_space(detection: DetectionResult, config: &ModelConfig, source: (u32, u32)) -> DetectionResult {
    DetectionResult {
        bbox: detection
            .bbox
            .map(|b| b.to_source_space(config, source).clamp_to(source.0, source.1)),
        ..detection
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::engine::decoder::BoundingBox;
    use crate::engine::preprocess::encode_test_image;
    use crate::engine::registry::test_config;
    use crate::engine::testing::{tensor, ScriptedEngine};
    use crate::storage::MemoryStorage;

    const VEHICLE_MODEL: &str = "models/vehicle.xml";
    const PLATE_MODEL: &str = "models/plate.xml";
    const CLASSIFIER_MODEL: &str = "models/classifier.xml";

    fn detection_config(artifact: &str, width: u32, height: u32) -> ModelConfig {
        let mut config = test_config(OutputKind::Detection, &["boxes", "scores"]);
        config.artifact_path = PathBuf::from(artifact);
        config.input_width = width;
        config.input_height = height;
        config
    }

    fn setup(engine: Arc<ScriptedEngine>) -> InferenceService<MemoryStorage> {
        let mut classifier = test_config(OutputKind::Classification, &["probs"]);
        classifier.artifact_path = PathBuf::from(CLASSIFIER_MODEL);
        classifier.input_width = 10;
        classifier.input_height = 12;

        let mut models = BTreeMap::new();
        models.insert(ModelType::ImageClassification, classifier);
        models.insert(ModelType::VehicleDetection, detection_config(VEHICLE_MODEL, 16, 12));
        models.insert(ModelType::LicensePlateDetection, detection_config(PLATE_MODEL, 12, 8));

        let registry = Arc::new(ModelConfigRegistry::from_settings(models).unwrap());
        let pool = Arc::new(ModelPool::new(engine, Duration::from_secs(300)));
        InferenceService::new(registry, pool, Arc::new(MemoryStorage::new()))
    }

    fn request(model_type: ModelType, image_data: String) -> InferenceRequest {
        InferenceRequest { image_data, model_type }
    }

    fn respond_box(engine: &ScriptedEngine, artifact: &str, bbox: &[f32], score: f32) {
        engine.respond(artifact, &[("boxes", tensor(bbox)), ("scores", tensor(&[score]))]);
    }

    #[tokio::test]
    async fn test_no_vehicle_persists_nothing() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, VEHICLE_MODEL, &[], 0.0);
        respond_box(&engine, PLATE_MODEL, &[1.0, 1.0, 2.0, 2.0], 0.9);
        let service = setup(engine.clone());

        let outcome = service
            .detect_cascade(request(ModelType::VehicleDetection, encode_test_image(40, 30, [10, 20, 30])), &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome, CascadeOutcome::NoVehiclePresent);
        assert_eq!(service.storage().count().await.unwrap(), 0);
        // Stage 2 never ran
        assert_eq!(engine.load_count(), 1);
    }

    #[tokio::test]
    async fn test_vehicle_without_plate() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, VEHICLE_MODEL, &[4.2, 200.0, 238.0, 1027.0], 0.92);
        respond_box(&engine, PLATE_MODEL, &[], 0.0);
        let service = setup(engine.clone());

        let outcome = service
            .detect_cascade(request(ModelType::VehicleDetection, encode_test_image(300, 1100, [90, 90, 90])), &CancelSignal::new())
            .await
            .unwrap();

        let CascadeOutcome::Detected(result) = outcome else {
            panic!("expected a vehicle");
        };
        assert_eq!(result.vehicle_detection.bbox, Some(BoundingBox::new(4.2, 200.0, 238.0, 1027.0)));
        assert_eq!(result.vehicle_detection.score, Some(0.92));
        assert!(result.license_plate_detection.is_none());
        assert!(result.license_plate_record_id.is_none());

        let records = service.storage().get_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, result.vehicle_record_id);
        assert_eq!(records[0].model_type, ModelType::VehicleDetection);

        // Each stage saw a tensor shaped by its own configuration
        let seen = engine.seen_inputs.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (PathBuf::from(VEHICLE_MODEL), vec![3, 16, 12]));
        assert_eq!(seen[1], (PathBuf::from(PLATE_MODEL), vec![3, 12, 8]));
    }

    #[tokio::test]
    async fn test_vehicle_and_plate_both_persisted() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, VEHICLE_MODEL, &[4.2, 200.0, 238.0, 1027.0], 0.92);
        respond_box(&engine, PLATE_MODEL, &[1.0, 2.0, 5.0, 6.0], 0.81);
        let service = setup(engine);

        let outcome = service
            .detect_cascade(request(ModelType::VehicleDetection, encode_test_image(300, 1100, [90, 90, 90])), &CancelSignal::new())
            .await
            .unwrap();

        let CascadeOutcome::Detected(result) = outcome else {
            panic!("expected a vehicle");
        };
        // Plate box is reported in source coordinates (crop starts at 4, 200)
        let plate = result.license_plate_detection.unwrap();
        assert_eq!(plate.bbox, Some(BoundingBox::new(5.0, 202.0, 9.0, 206.0)));
        assert_eq!(plate.score, Some(0.81));

        let records = service.storage().get_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].model_type, ModelType::LicensePlateDetection);
        assert_eq!(Some(records[1].id.clone()), result.license_plate_record_id);
        assert!(records[1].image_data.is_some());
    }

    #[tokio::test]
    async fn test_stage_two_failure_keeps_stage_one_only() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, VEHICLE_MODEL, &[0.0, 0.0, 20.0, 20.0], 0.7);
        engine.fail(PLATE_MODEL, "device lost");
        let service = setup(engine);

        let err = service
            .detect_cascade(request(ModelType::VehicleDetection, encode_test_image(40, 30, [1, 2, 3])), &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InferenceEngine { .. }));
        let records = service.storage().get_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model_type, ModelType::VehicleDetection);
    }

    /// Red on the left half, blue on the right half
    fn two_colour_image(width: u32, height: u32) -> String {
        let image = image::RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        encode_base64_png(&DynamicImage::ImageRgb8(image)).unwrap()
    }

    #[tokio::test]
    async fn test_stage_two_sees_only_the_vehicle_crop() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, VEHICLE_MODEL, &[60.0, 10.0, 90.0, 90.0], 0.9);
        respond_box(&engine, PLATE_MODEL, &[1.0, 1.0, 5.0, 5.0], 0.8);
        let service = setup(engine.clone());

        let outcome = service
            .detect_cascade(request(ModelType::VehicleDetection, two_colour_image(100, 100)), &CancelSignal::new())
            .await
            .unwrap();
        assert!(matches!(outcome, CascadeOutcome::Detected(_)));

        // Stage 1 saw both halves, stage 2 only the blue vehicle region
        let red = engine.seen_red_means.lock().clone();
        assert_eq!(red.len(), 2);
        assert_eq!(red[0].0, PathBuf::from(VEHICLE_MODEL));
        assert!(red[0].1 > 0.3 && red[0].1 < 0.7, "stage 1 red mean {}", red[0].1);
        assert_eq!(red[1].0, PathBuf::from(PLATE_MODEL));
        assert!(red[1].1 < 0.01, "stage 2 red mean {}", red[1].1);

        // The stored plate record carries the crop itself
        let records = service.storage().get_all().await.unwrap();
        let crop_data = records[1].image_data.as_deref().unwrap();
        let crop = decode_image(&decode_base64(crop_data).unwrap()).unwrap();
        assert_eq!(crop.dimensions(), (30, 80));
    }

    #[tokio::test]
    async fn test_box_outside_image_is_no_vehicle() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, VEHICLE_MODEL, &[5000.0, 5000.0, 6000.0, 6000.0], 0.9);
        respond_box(&engine, PLATE_MODEL, &[1.0, 1.0, 2.0, 2.0], 0.9);
        let service = setup(engine.clone());

        let outcome = service
            .detect_cascade(request(ModelType::VehicleDetection, encode_test_image(300, 300, [0, 0, 0])), &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome, CascadeOutcome::NoVehiclePresent);
        assert_eq!(service.storage().count().await.unwrap(), 0);
        assert_eq!(engine.load_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_stage_two_keeps_stage_one_only() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, VEHICLE_MODEL, &[0.0, 0.0, 20.0, 20.0], 0.7);
        respond_box(&engine, PLATE_MODEL, &[1.0, 1.0, 2.0, 2.0], 0.9);
        engine.delay(PLATE_MODEL, Duration::from_millis(500));
        let service = setup(engine);

        // Fire as soon as stage 1 has been stored, while stage 2 is running
        let cancel = CancelSignal::new();
        let watcher = {
            let storage = service.storage().clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                while storage.count().await.unwrap() == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                cancel.cancel();
            })
        };

        let start = Instant::now();
        let err = service
            .detect_cascade(request(ModelType::VehicleDetection, encode_test_image(40, 30, [1, 2, 3])), &cancel)
            .await
            .unwrap_err();
        watcher.await.unwrap();

        assert!(matches!(err, PipelineError::Cancelled));
        assert!(start.elapsed() < Duration::from_millis(400));
        let records = service.storage().get_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model_type, ModelType::VehicleDetection);
    }

    #[tokio::test]
    async fn test_cancelled_request_persists_nothing() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, VEHICLE_MODEL, &[0.0, 0.0, 20.0, 20.0], 0.7);
        respond_box(&engine, PLATE_MODEL, &[1.0, 1.0, 2.0, 2.0], 0.9);
        let service = setup(engine.clone());

        let cancel = CancelSignal::new();
        cancel.cancel();
        let err = service
            .detect_cascade(request(ModelType::VehicleDetection, encode_test_image(40, 30, [1, 2, 3])), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert_eq!(service.storage().count().await.unwrap(), 0);
        assert_eq!(engine.load_count(), 0);
    }

    #[tokio::test]
    async fn test_cascade_requires_vehicle_model_type() {
        let engine = Arc::new(ScriptedEngine::new());
        let service = setup(engine.clone());

        let err = service
            .detect_cascade(request(ModelType::LicensePlateDetection, encode_test_image(4, 4, [0, 0, 0])), &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InputValidation(_)));
        assert_eq!(engine.load_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_image_never_reaches_engine() {
        let engine = Arc::new(ScriptedEngine::new());
        let service = setup(engine.clone());
        let cancel = CancelSignal::new();

        let err = service
            .detect_cascade(request(ModelType::VehicleDetection, "not base64!".to_string()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InputValidation(_)));

        let err = service
            .classify(request(ModelType::ImageClassification, "abc".to_string()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InputValidation(_)));

        assert_eq!(engine.load_count(), 0);
        assert_eq!(service.storage().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_classify_vehicle() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.respond(CLASSIFIER_MODEL, &[("probs", tensor(&[0.2, 0.8]))]);
        let service = setup(engine.clone());

        let result = service
            .classify(request(ModelType::ImageClassification, encode_test_image(20, 20, [5, 5, 5])), &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(result.predicted_class, "Vehicle");
        assert_eq!(result.probability_scores, vec![0.2, 0.8]);

        let stored = service.storage().get_by_id(&result.record_id).await.unwrap().unwrap();
        assert_eq!(stored.predicted_class.as_deref(), Some("Vehicle"));

        let seen = engine.seen_inputs.lock().clone();
        assert_eq!(seen, vec![(PathBuf::from(CLASSIFIER_MODEL), vec![3, 10, 12])]);
    }

    #[tokio::test]
    async fn test_classify_non_vehicle() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.respond(CLASSIFIER_MODEL, &[("probs", tensor(&[0.5, 0.5]))]);
        let service = setup(engine);

        let result = service
            .classify(request(ModelType::ImageClassification, encode_test_image(20, 20, [5, 5, 5])), &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(result.predicted_class, "Non-Vehicle");
    }

    #[tokio::test]
    async fn test_classify_rejects_detection_model() {
        let engine = Arc::new(ScriptedEngine::new());
        let service = setup(engine.clone());

        let err = service
            .classify(request(ModelType::VehicleDetection, encode_test_image(4, 4, [0, 0, 0])), &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Configuration(_)));
        assert_eq!(engine.load_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_model_type() {
        let engine = Arc::new(ScriptedEngine::new());
        let service = setup(engine);

        let err = service
            .predict(request(ModelType::DamageDetection, encode_test_image(4, 4, [0, 0, 0])), &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_predict_does_not_persist() {
        let engine = Arc::new(ScriptedEngine::new());
        respond_box(&engine, PLATE_MODEL, &[-3.0, 2.0, 50.0, 6.0], 0.66);
        let service = setup(engine);

        let result = service
            .predict(request(ModelType::LicensePlateDetection, encode_test_image(40, 30, [0, 0, 0])), &CancelSignal::new())
            .await
            .unwrap();

        let InferenceResult::Detection(detection) = result else {
            panic!("expected a detection");
        };
        assert_eq!(detection.bbox, Some(BoundingBox::new(0.0, 2.0, 40.0, 6.0)));
        assert_eq!(service.storage().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_loaded_models() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.respond(CLASSIFIER_MODEL, &[("probs", tensor(&[0.9, 0.1]))]);
        let service = setup(engine);

        let health = service.health();
        assert!(health.healthy);
        assert_eq!(health.models_loaded.len(), 3);
        assert!(health.models_loaded.values().all(|loaded| !loaded));

        service
            .classify(request(ModelType::ImageClassification, encode_test_image(8, 8, [1, 1, 1])), &CancelSignal::new())
            .await
            .unwrap();

        let health = service.health();
        assert_eq!(health.models_loaded.get("image_classification"), Some(&true));
        assert_eq!(health.models_loaded.get("vehicle_detection"), Some(&false));
    }
}
