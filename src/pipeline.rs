//! # Pipeline driver
//!
//! [`PipelineState`] is an immutable value holding the loaded table, the stage
//! parameters (column selection, filter, sort) and each stage's output. Changing a
//! parameter builds a new state that re-runs only the stages downstream of it.
//! [`Session`] owns the current state plus the states before it, so undo is a matter
//! of restoring the previous value.
use crate::error::SheetPipelineError;
use crate::export::write_table;
use crate::export::ExportFormat;
use crate::export::ExportNamer;
use crate::export::NamingOptions;
use crate::preset::ColumnConfig;
use crate::preset::PresetStore;
use crate::spreadsheet;
use crate::spreadsheet::ReadOptions;
use crate::spreadsheet::SheetSource;
use crate::table::filter::filter;
use crate::table::filter::FilterCriterion;
use crate::table::projector::project;
use crate::table::projector::ColumnSelection;
use crate::table::sorter::sort;
use crate::table::sorter::SortSpec;
use crate::table::Table;
use chrono::NaiveDateTime;
use log::info;
use log::warn;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineState {
    base: Arc<Table>,
    selection: ColumnSelection,
    filter: Option<FilterCriterion>,
    sort: Option<SortSpec>,
    projected: Arc<Table>,
    filtered: Arc<Table>,
    view: Arc<Table>,
}

impl PipelineState {
    /// State showing `table` unchanged: all columns, no filter, no sort.
    pub fn new(table: Table) -> Self {
        let base = Arc::new(table);
        PipelineState {
            selection: ColumnSelection::all(),
            filter: None,
            sort: None,
            projected: base.clone(),
            filtered: base.clone(),
            view: base.clone(),
            base,
        }
    }

    /// The table as loaded from the source.
    pub fn base(&self) -> &Table {
        &self.base
    }

    pub fn selection(&self) -> &ColumnSelection {
        &self.selection
    }

    pub fn filter(&self) -> Option<&FilterCriterion> {
        self.filter.as_ref()
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Output of the projection stage.
    pub fn projected(&self) -> &Table {
        &self.projected
    }

    /// Output of the filter stage.
    pub fn filtered(&self) -> &Table {
        &self.filtered
    }

    /// Output of the last stage: what is displayed and exported.
    pub fn view(&self) -> &Table {
        &self.view
    }

    /// Columns the filter and sort may refer to.
    pub fn available_columns(&self) -> &[String] {
        self.projected.columns()
    }

    /// New state with another column selection.
    ///
    /// Fails with `InvalidColumn` when a name is not in the loaded table. A filter or
    /// sort on a column the new selection leaves out is dropped with a warning.
    pub fn with_selection(&self, selection: ColumnSelection) -> Result<Self, SheetPipelineError> {
        let selection = ColumnSelection::new(&self.base, selection.columns().iter().cloned())?;
        let projected = Arc::new(project(&self.base, &selection));

        let criterion = self.filter.clone().filter(|criterion| {
            let keep = projected.has_column(&criterion.column);
            if !keep {
                warn!("Filter on '{}' dropped: column is no longer selected", criterion.column);
            }
            keep
        });
        let spec = self.sort.clone().filter(|spec| {
            let keep = projected.has_column(&spec.column);
            if !keep {
                warn!("Sort on '{}' dropped: column is no longer selected", spec.column);
            }
            keep
        });

        let filtered = run_filter(&projected, criterion.as_ref())?;
        let view = run_sort(&filtered, spec.as_ref())?;
        Ok(PipelineState {
            base: self.base.clone(),
            selection,
            filter: criterion,
            sort: spec,
            projected,
            filtered,
            view,
        })
    }

    /// New state with another filter (or none), re-sorted.
    pub fn with_filter(&self, criterion: Option<FilterCriterion>) -> Result<Self, SheetPipelineError> {
        let filtered = run_filter(&self.projected, criterion.as_ref())?;
        let view = run_sort(&filtered, self.sort.as_ref())?;
        Ok(PipelineState {
            filter: criterion,
            filtered,
            view,
            ..self.clone()
        })
    }

    /// New state with another sort (or none).
    pub fn with_sort(&self, spec: Option<SortSpec>) -> Result<Self, SheetPipelineError> {
        let view = run_sort(&self.filtered, spec.as_ref())?;
        Ok(PipelineState {
            sort: spec,
            view,
            ..self.clone()
        })
    }
}

fn run_filter(table: &Arc<Table>, criterion: Option<&FilterCriterion>) -> Result<Arc<Table>, SheetPipelineError> {
    match criterion {
        Some(criterion) => Ok(Arc::new(filter(table, criterion)?)),
        None => Ok(table.clone()),
    }
}

fn run_sort(table: &Arc<Table>, spec: Option<&SortSpec>) -> Result<Arc<Table>, SheetPipelineError> {
    match spec {
        Some(spec) => Ok(Arc::new(sort(table, spec)?)),
        None => Ok(table.clone()),
    }
}

/// Outcome of applying a saved preset to the current sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetReport {
    pub config: ColumnConfig,
    /// Saved columns the current sheet does not have; left out of the selection.
    pub missing: Vec<String>,
    /// Sheet the preset was saved against, when it differs from the current one.
    pub sheet_mismatch: Option<String>,
}

/// An interactive session: the open workbook, the current state and its history.
///
/// Every operation either replaces the current state or fails and leaves it as it was.
pub struct Session {
    source: Option<Box<dyn SheetSource>>,
    source_path: Option<PathBuf>,
    sheet_name: Option<String>,
    read_options: ReadOptions,
    namer: ExportNamer,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ReadOptions::default(), NamingOptions::default())
    }
}

impl Session {
    pub fn new(read_options: ReadOptions, naming: NamingOptions) -> Self {
        Session {
            source: None,
            source_path: None,
            sheet_name: None,
            read_options,
            namer: ExportNamer::new(naming),
            state: PipelineState::default(),
            history: Vec::new(),
        }
    }

    /// Opens a workbook and returns its sheet names. The current table stays until a sheet is loaded.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>, SheetPipelineError> {
        let path = path.as_ref();
        let source = spreadsheet::open(path)?;
        let sheet_names = source.sheet_names();
        info!("Opened '{}' with sheets: {}", path.display(), sheet_names.join(", "));
        self.source = Some(source);
        self.source_path = Some(path.to_path_buf());
        Ok(sheet_names)
    }

    /// Sheet names of the open workbook.
    pub fn sheet_names(&self) -> Vec<String> {
        self.source.as_ref().map(|source| source.sheet_names()).unwrap_or_default()
    }

    /// Reads a sheet of the open workbook and starts over from it.
    pub fn load_sheet(&mut self, sheet_name: &str) -> Result<&Table, SheetPipelineError> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| SheetPipelineError::WithContextError("No workbook is open".to_owned()))?;
        let table = source.read_sheet(sheet_name, &self.read_options)?;
        Ok(self.load_table(sheet_name, table))
    }

    /// Starts over from an in-memory table.
    pub fn load_table(&mut self, sheet_name: &str, table: Table) -> &Table {
        self.sheet_name = Some(sheet_name.to_owned());
        self.state = PipelineState::new(table);
        self.history.clear();
        self.state.view()
    }

    pub fn naming(&self) -> &NamingOptions {
        self.namer.options()
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn view(&self) -> &Table {
        self.state.view()
    }

    fn commit(&mut self, next: PipelineState) -> &Table {
        let previous = std::mem::replace(&mut self.state, next);
        self.history.push(previous);
        self.state.view()
    }

    /// Selects columns by name, in the given order; an empty list selects all columns.
    pub fn select_columns<I, S>(&mut self, names: I) -> Result<&Table, SheetPipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next = self.state.with_selection(ColumnSelection::from_names(names))?;
        Ok(self.commit(next))
    }

    pub fn apply_filter(&mut self, criterion: FilterCriterion) -> Result<&Table, SheetPipelineError> {
        let next = self.state.with_filter(Some(criterion))?;
        Ok(self.commit(next))
    }

    pub fn clear_filter(&mut self) -> Result<&Table, SheetPipelineError> {
        let next = self.state.with_filter(None)?;
        Ok(self.commit(next))
    }

    pub fn apply_sort(&mut self, spec: SortSpec) -> Result<&Table, SheetPipelineError> {
        let next = self.state.with_sort(Some(spec))?;
        Ok(self.commit(next))
    }

    pub fn clear_sort(&mut self) -> Result<&Table, SheetPipelineError> {
        let next = self.state.with_sort(None)?;
        Ok(self.commit(next))
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Restores the state before the last operation. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.state = previous;
                true
            }
            None => false,
        }
    }

    /// Saves the current column selection, with the current sheet name, as preset `name`.
    pub fn save_preset(&self, store: &PresetStore, name: &str) -> Result<ColumnConfig, SheetPipelineError> {
        let config = ColumnConfig::new(self.sheet_name(), self.state.projected().columns());
        store.save(name, &config)
    }

    /// Applies a saved preset to the current table.
    ///
    /// Saved columns the table lacks are dropped and reported, never an error. A preset
    /// saved against another sheet is applied all the same, with the mismatch reported.
    pub fn load_preset(&mut self, store: &PresetStore, name: &str) -> Result<PresetReport, SheetPipelineError> {
        let config = store.load(name)?;
        let reconciliation = ColumnSelection::reconcile(self.state.base(), config.columns.iter().cloned());
        let sheet_mismatch = config
            .sheet_name
            .clone()
            .filter(|saved| Some(saved.as_str()) != self.sheet_name());
        if let Some(saved) = &sheet_mismatch {
            warn!(
                "Preset '{}' was saved for sheet '{}' but the current sheet is '{}'",
                config.name,
                saved,
                self.sheet_name().unwrap_or_default()
            );
        }
        let next = self.state.with_selection(reconciliation.selection)?;
        self.commit(next);
        Ok(PresetReport {
            config,
            missing: reconciliation.missing,
            sheet_mismatch,
        })
    }

    /// Default export file name for the current state, with the extension of `format`.
    pub fn default_export_name(&self, format: ExportFormat, now: NaiveDateTime) -> String {
        let base_name = self
            .source_path
            .as_ref()
            .and_then(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "export".to_owned());
        let name = self.namer.name_for(
            &base_name,
            self.sheet_name(),
            self.state.filter(),
            self.state.sort(),
            now,
        );
        format!("{}.{}", name, format.extension())
    }

    /// Writes the current view to `path`.
    pub fn export(&self, path: impl AsRef<Path>, format: ExportFormat) -> Result<(), SheetPipelineError> {
        write_table(self.view(), path, format)
    }

    /// Writes the current view into `dir` under its default name and returns the path written.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>, format: ExportFormat, now: NaiveDateTime) -> Result<PathBuf, SheetPipelineError> {
        let path = dir.as_ref().join(self.default_export_name(format, now));
        self.export(&path, format)?;
        Ok(path)
    }
}
