// Media exporter - Composes, runs and stages one export

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::app::container::ExportContext;
use crate::app::opener::MediaOpener;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::{
    CommandComposer, ComplexFilterRegistry, CompositionMode, InvocationPlan, ProgressBridge,
    ProgressCallback, TranscodeDriver,
};
use crate::output::{StagedOutput, Stager, TemporaryDirectories};
use crate::ports::ProgressEvent;

/// Summary of a finished export
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub state: ExportState,
    pub mode: CompositionMode,
    /// Engine arguments, without the program name
    pub args: Vec<String>,
    pub staged: Vec<StagedOutput>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub engine_elapsed_ms: u64,
}

/// Everything built for one save attempt. Nothing here is visible on the
/// session until the attempt succeeds.
struct Composition {
    plan: InvocationPlan,
    driver: TranscodeDriver,
    filters: ComplexFilterRegistry,
    destinations: Vec<MediaRef>,
    /// Scratch directory name of the concat list, when one is needed
    scratch_name: Option<String>,
}

/// Export session over one collection of inputs
pub struct MediaExporter {
    ctx: ExportContext,
    collection: MediaCollection,
    driver: TranscodeDriver,
    format: Option<Format>,
    mappings: Vec<OutputMapping>,
    applied_mappings: Vec<OutputMapping>,
    filters: ComplexFilterRegistry,
    concat: Option<ConcatOptions>,
    timelapse_framerate: Option<f64>,
    to_disk: Option<String>,
    visibility: Option<Visibility>,
    progress: Option<ProgressCallback>,
    state: ExportState,
    report: Option<ExportReport>,
}

impl std::fmt::Debug for MediaExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaExporter")
            .field("inputs", &self.collection.len())
            .field("state", &self.state)
            .field("mappings", &self.mappings.len())
            .field("pending_filters", &self.filters.pending().len())
            .field("to_disk", &self.to_disk)
            .finish()
    }
}

impl MediaExporter {
    pub fn new(ctx: ExportContext, collection: MediaCollection, driver: TranscodeDriver) -> Self {
        Self {
            ctx,
            collection,
            driver,
            format: None,
            mappings: Vec::new(),
            applied_mappings: Vec::new(),
            filters: ComplexFilterRegistry::new(),
            concat: None,
            timelapse_framerate: None,
            to_disk: None,
            visibility: None,
            progress: None,
            state: ExportState::Configuring,
            report: None,
        }
    }

    fn configuring(&mut self) -> &mut Self {
        self.state = ExportState::Configuring;
        self
    }

    /// Format of the single-output export
    pub fn in_format(&mut self, format: Format) -> &mut Self {
        self.format = Some(format);
        self.configuring()
    }

    /// Receive whole percentages while the export runs. The last call is
    /// always 100, made once every output is staged.
    pub fn on_progress<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(u32) + Send + 'static,
    {
        self.progress = Some(Box::new(callback));
        self.configuring()
    }

    /// Add an output fed by `sources` (filter output labels such as `[v480]`
    /// or input streams such as `[0:a]`)
    pub fn add_format_output_mapping<I, S>(
        &mut self,
        format: Format,
        output: MediaRef,
        sources: I,
        disable_audio: bool,
        disable_video: bool,
    ) -> Result<&mut Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mapping = OutputMapping::new(
            sources.into_iter().map(Into::into).collect(),
            format,
            output,
            disable_audio,
            disable_video,
        )?;
        debug!(output = %mapping.output(), sources = ?mapping.sources(), "Output mapping added");
        self.mappings.push(mapping);
        Ok(self.configuring())
    }

    /// Declare a complex filter edge, e.g. `("[0:v]", "scale=640:480", "[v480]")`
    pub fn add_filter(
        &mut self,
        inputs: &str,
        expression: &str,
        outputs: &str,
    ) -> Result<&mut Self, DomainError> {
        self.filters.add(ComplexFilter::new(inputs, expression, outputs)?);
        Ok(self.configuring())
    }

    /// Disk the single output is written to
    pub fn to_disk(&mut self, disk: impl Into<String>) -> &mut Self {
        self.to_disk = Some(disk.into());
        self.configuring()
    }

    pub fn with_visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.visibility = Some(visibility);
        self.configuring()
    }

    /// Read the inputs as an image sequence at `framerate`
    pub fn as_timelapse_with_framerate(&mut self, framerate: f64) -> &mut Self {
        self.timelapse_framerate = Some(framerate);
        self.configuring()
    }

    /// Re-encode all inputs into one output through the `concat` filter
    pub fn concat_with_transcoding(&mut self, has_video: bool, has_audio: bool) -> &mut Self {
        self.concat = Some(ConcatOptions {
            has_video,
            has_audio,
        });
        self.configuring()
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn inputs(&self) -> &MediaCollection {
        &self.collection
    }

    /// Filters applied by earlier saves
    pub fn applied_filters(&self) -> &[ComplexFilter] {
        self.filters.applied()
    }

    pub fn pending_filters(&self) -> &[ComplexFilter] {
        self.filters.pending()
    }

    /// Mappings consumed by earlier saves
    pub fn applied_mappings(&self) -> &[OutputMapping] {
        &self.applied_mappings
    }

    /// Report of the last successful save
    pub fn report(&self) -> Option<&ExportReport> {
        self.report.as_ref()
    }

    /// Build the invocation `save(path)` would run, without running it and
    /// without changing the session
    pub fn get_command(&self, path: Option<&str>) -> Result<InvocationPlan, DomainError> {
        Ok(self.compose(path)?.plan)
    }

    /// Disk outputs land on: the chosen one, else the first input's
    fn destination_disk(&self) -> Result<&str, DomainError> {
        if let Some(disk) = self.to_disk.as_deref() {
            return Ok(disk);
        }
        self.collection
            .first()
            .map(MediaRef::disk)
            .ok_or_else(|| DomainError::BadArgs("No inputs loaded".to_string()))
    }

    fn compose(&self, path: Option<&str>) -> Result<Composition, DomainError> {
        CompositionRules::check(&CompositionRequest {
            has_mappings: !self.mappings.is_empty(),
            concat_with_transcoding: self.concat.is_some(),
            concat_without_transcoding: self.driver.is_concat(),
            frame_extraction: self.driver.frame_position().is_some(),
            has_format: self.format.is_some(),
            has_save_path: path.is_some(),
            input_count: self.collection.len(),
        })?;

        let output = path
            .map(|p| MediaRef::new(self.destination_disk()?, p))
            .transpose()?;

        let mut driver = self.driver.clone();
        let mut filters = self.filters.clone();
        let mut mappings = self.mappings.clone();

        if let Some(options) = self.concat {
            // Rules guarantee a format and a path here
            let (format, output) = match (&self.format, &output) {
                (Some(format), Some(output)) => (format, output),
                _ => {
                    return Err(DomainError::InternalError(
                        "concat without format or destination".to_string(),
                    ))
                }
            };
            filters.add(ConcatSynthesizer::filter(self.collection.len(), options)?);
            mappings.push(OutputMapping::new(
                vec![ConcatSynthesizer::source_label()],
                format.clone(),
                output.clone(),
                false,
                false,
            )?);
        }

        let temp = &self.ctx.temp;

        if !mappings.is_empty() {
            if output.is_some() && self.concat.is_none() {
                debug!("Output mappings present, single-output path and format are ignored");
            }

            let destinations: Vec<MediaRef> = mappings.iter().map(|m| m.output().clone()).collect();
            CompositionRules::check_destinations(&destinations)?;
            self.check_disks(&destinations)?;

            filters.apply_all(&mut driver, &mappings)?;
            for mapping in &mappings {
                mapping.apply(&mut driver, &engine_path(temp, mapping.output()))?;
            }
            let plan = CommandComposer::compose_advanced(&driver)?;
            debug!(
                filter_graph = plan.filter_graph().unwrap_or(""),
                outputs = plan.outputs.len(),
                "Invocation composed"
            );

            return Ok(Composition {
                plan,
                driver,
                filters,
                destinations,
                scratch_name: None,
            });
        }

        let output = output.ok_or_else(|| {
            DomainError::BadArgs("A destination path is required".to_string())
        })?;
        self.check_disks(std::slice::from_ref(&output))?;

        let mut format = self.format.clone();
        if let (Some(format), Some(framerate)) = (format.as_mut(), self.timelapse_framerate) {
            if TimelapseRule::applies(false, Some(framerate)) {
                let merged = TimelapseRule::merge(format.initial_parameters(), framerate);
                format.set_initial_parameters(merged);
            }
        }

        filters.apply_all(&mut driver, &[])?;

        let scratch_name = TemporaryDirectories::dir_name_for(&output);
        let plan = CommandComposer::compose_legacy(
            &driver,
            format.as_ref(),
            &engine_path(temp, &output),
            &temp.scratch_path(&scratch_name),
        )?;

        Ok(Composition {
            scratch_name: (!plan.support_files.is_empty()).then_some(scratch_name),
            plan,
            driver,
            filters,
            destinations: vec![output],
        })
    }

    fn check_disks(&self, destinations: &[MediaRef]) -> Result<(), DomainError> {
        for destination in destinations {
            self.ctx.disks.get(destination.disk())?;
        }
        Ok(())
    }

    /// Compose, run the engine and stage every output. Returns an opener on
    /// the destination disk over the same inputs.
    pub async fn save(&mut self, path: Option<&str>) -> Result<MediaOpener, DomainError> {
        let started_at = Utc::now();

        self.state = ExportState::Composing;
        let composition = self.compose(path).map_err(|e| self.fail(e))?;
        let destination_disk = self.destination_disk().map(str::to_string);
        let destination_disk = destination_disk.map_err(|e| self.fail(e))?;

        self.state = ExportState::Executing;
        if let Err(e) = self.prepare(&composition).await {
            self.discard(&composition).await;
            return Err(self.fail(e));
        }

        let mut bridge = ProgressBridge::new(self.progress.take());
        let outcome = self
            .ctx
            .engine
            .run(&composition.plan, &mut |event: ProgressEvent| bridge.on_event(event))
            .await;

        if let Some(name) = &composition.scratch_name {
            if let Err(e) = self.ctx.temp.remove(&self.ctx.temp.scratch_path(name)).await {
                warn!(error = %e, "Could not remove scratch directory");
            }
        }

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.progress = bridge.into_callback();
                self.discard(&composition).await;
                return Err(self.fail(e));
            }
        };

        self.state = ExportState::Staging;
        let stager = Stager::new(&self.ctx.disks, &self.ctx.temp);
        let staged = match stager
            .stage_all(&composition.destinations, self.visibility)
            .await
        {
            Ok(staged) => staged,
            Err(e) => {
                self.progress = bridge.into_callback();
                self.discard(&composition).await;
                return Err(self.fail(e));
            }
        };

        bridge.finish();
        self.progress = bridge.into_callback();

        let Composition {
            plan,
            driver,
            filters,
            ..
        } = composition;
        self.filters = filters;
        self.applied_mappings.append(&mut self.mappings);
        self.driver = driver.fresh();
        self.state = ExportState::Done;

        info!(
            outputs = staged.len(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Export finished"
        );
        self.report = Some(ExportReport {
            state: self.state,
            mode: plan.mode,
            args: plan.args,
            staged,
            started_at,
            finished_at: Utc::now(),
            engine_elapsed_ms: outcome.elapsed.as_millis() as u64,
        });

        Ok(MediaOpener::bound(
            destination_disk,
            self.ctx.clone(),
            self.collection.clone(),
        ))
    }

    /// Create output working directories and support files
    async fn prepare(&self, composition: &Composition) -> Result<(), DomainError> {
        let temp = &self.ctx.temp;
        for destination in &composition.destinations {
            temp.create_for(destination).await?;
        }

        if let Some(name) = &composition.scratch_name {
            temp.create_scratch(name).await?;
        }
        for file in &composition.plan.support_files {
            tokio::fs::write(&file.path, &file.contents).await.map_err(|e| {
                DomainError::FsFail(format!(
                    "Failed to write {}: {}",
                    file.path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Remove every working directory of a failed attempt
    async fn discard(&self, composition: &Composition) {
        let temp = &self.ctx.temp;
        let dirs: Vec<PathBuf> = composition
            .destinations
            .iter()
            .map(|d| temp.path_for(d))
            .chain(composition.scratch_name.iter().map(|n| temp.scratch_path(n)))
            .collect();
        for dir in dirs {
            if let Err(e) = temp.remove(&dir).await {
                warn!(dir = %dir.display(), error = %e, "Could not remove working directory");
            }
        }
    }

    fn fail(&mut self, e: DomainError) -> DomainError {
        if e.is_composition_error() {
            warn!(state = %self.state, error = %e, "Export rejected");
        } else {
            error!(state = %self.state, error = %e, "Export failed");
        }
        self.state = ExportState::Failed;
        e
    }
}

/// Local path the engine writes an output to
fn engine_path(temp: &TemporaryDirectories, media: &MediaRef) -> PathBuf {
    temp.path_for(media).join(media.file_name())
}
