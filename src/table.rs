use crate::config::config::TableConfig;
use crate::data::column_model::{ColumnDescriptor, ColumnModel};
use crate::data::data_view::{compute_working_set, DataView};
use crate::data::row::Row;
use crate::debouncer::SearchInput;
use crate::export::data_exporter::{
    DataExporter, DirectoryTarget, ExportFormat, ExportScope, ExportSummary, ExportTarget,
};
use crate::notify::{Notifier, TracingNotifier};
use crate::pagination::client::ClientPaginator;
use crate::pagination::paginator::{page_window, PageItem, PaginationState};
use crate::pagination::server::{FetchOutcome, PageFetcher, ServerPaginator};
use crate::render::cell_renderer::{
    CellContent, CellRenderer, RenderActionsFn, RenderCellFn, RowAction,
};
use crate::state::selection::{BulkAction, SelectAllState, SelectionPolicy, SelectionState};
use crate::state::table_state::{LayoutSnapshot, SortDirection, TableState};
use crate::storage::LayoutStore;
use anyhow::{anyhow, bail, Result};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

pub type RowIdFn<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;
pub type RowPredicateFn<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;
pub type RowClickFn<R> = Arc<dyn Fn(&R) + Send + Sync>;
pub type SelectRowFn = Arc<dyn Fn(&str, bool) + Send + Sync>;
pub type SelectAllFn = Arc<dyn Fn(bool) + Send + Sync>;

/// Where a table's rows come from
pub enum DataSource<R: Send> {
    /// Every row is in memory; filter, sort and paging happen locally
    Client(Vec<R>),
    /// Rows arrive one page at a time from the fetcher
    Server(Arc<dyn PageFetcher<R>>),
}

/// Caller-supplied behaviour and defaults for one table instance
pub struct TableOptions<R> {
    /// Key the column layout is persisted under; no persistence when unset
    pub storage_key: Option<String>,
    pub store: Option<Arc<dyn LayoutStore>>,
    pub per_page: usize,
    /// Page sizes `set_per_page` accepts; any size when empty
    pub per_page_options: Vec<usize>,
    pub max_visible_pages: usize,
    pub search_debounce_ms: u64,
    pub selection_policy: SelectionPolicy,
    pub clear_selection_on_page_change: bool,
    /// Row identifier; falls back to the row's `id` field
    pub get_item_id: Option<RowIdFn<R>>,
    pub render_cell: Option<RenderCellFn<R>>,
    pub render_actions: Option<RenderActionsFn<R>>,
    pub is_row_disabled: Option<RowPredicateFn<R>>,
    pub on_row_click: Option<RowClickFn<R>>,
    /// Called with the id and new checked state when a row checkbox changes
    pub on_select_row: Option<SelectRowFn>,
    /// Called when the header checkbox changes the selection
    pub on_select_all: Option<SelectAllFn>,
    pub bulk_actions: Vec<BulkAction<R>>,
    pub empty_message: String,
    pub placeholder: String,
    pub export_file_name: String,
    pub export_format: ExportFormat,
    pub export_target: Arc<dyn ExportTarget>,
    pub notifier: Arc<dyn Notifier>,
}

impl<R> Default for TableOptions<R> {
    fn default() -> Self {
        Self {
            storage_key: None,
            store: None,
            per_page: 10,
            per_page_options: vec![10, 25, 50, 100],
            max_visible_pages: 5,
            search_debounce_ms: 800,
            selection_policy: SelectionPolicy::Page,
            clear_selection_on_page_change: false,
            get_item_id: None,
            render_cell: None,
            render_actions: None,
            is_row_disabled: None,
            on_row_click: None,
            on_select_row: None,
            on_select_all: None,
            bulk_actions: Vec::new(),
            empty_message: "No data available".to_string(),
            placeholder: String::new(),
            export_file_name: "table-export".to_string(),
            export_format: ExportFormat::Csv,
            export_target: Arc::new(DirectoryTarget::new(".")),
            notifier: Arc::new(TracingNotifier),
        }
    }
}

impl<R> TableOptions<R> {
    /// Options seeded from the user's config file
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            per_page: config.pagination.default_per_page.max(1),
            per_page_options: config.pagination.per_page_options.clone(),
            max_visible_pages: config.pagination.max_visible_pages.max(1),
            search_debounce_ms: config.search.debounce_ms,
            selection_policy: config.selection.policy,
            clear_selection_on_page_change: config.selection.clear_on_page_change,
            export_file_name: config.export.default_file_name.clone(),
            export_format: config.export.format,
            export_target: Arc::new(DirectoryTarget::new(config.export_dir())),
            ..Self::default()
        }
    }

    pub fn with_storage(mut self, key: impl Into<String>, store: Arc<dyn LayoutStore>) -> Self {
        self.storage_key = Some(key.into());
        self.store = Some(store);
        self
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn with_per_page_options(mut self, options: Vec<usize>) -> Self {
        self.per_page_options = options;
        self
    }

    pub fn with_search_debounce(mut self, delay_ms: u64) -> Self {
        self.search_debounce_ms = delay_ms;
        self
    }

    pub fn with_selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.selection_policy = policy;
        self
    }

    pub fn with_clear_selection_on_page_change(mut self, clear: bool) -> Self {
        self.clear_selection_on_page_change = clear;
        self
    }

    pub fn with_item_id<F>(mut self, get_item_id: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        self.get_item_id = Some(Arc::new(get_item_id));
        self
    }

    pub fn with_render_cell<F>(mut self, render_cell: F) -> Self
    where
        F: Fn(&R, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.render_cell = Some(Arc::new(render_cell));
        self
    }

    pub fn with_render_actions<F>(mut self, render_actions: F) -> Self
    where
        F: Fn(&R) -> Vec<RowAction> + Send + Sync + 'static,
    {
        self.render_actions = Some(Arc::new(render_actions));
        self
    }

    pub fn with_row_disabled<F>(mut self, is_row_disabled: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.is_row_disabled = Some(Arc::new(is_row_disabled));
        self
    }

    pub fn with_row_click<F>(mut self, on_row_click: F) -> Self
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.on_row_click = Some(Arc::new(on_row_click));
        self
    }

    pub fn with_on_select_row<F>(mut self, on_select_row: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.on_select_row = Some(Arc::new(on_select_row));
        self
    }

    pub fn with_on_select_all<F>(mut self, on_select_all: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on_select_all = Some(Arc::new(on_select_all));
        self
    }

    pub fn with_bulk_action<F>(mut self, label: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[&R]) + Send + Sync + 'static,
    {
        self.bulk_actions.push(BulkAction::new(label, Arc::new(handler)));
        self
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_export(
        mut self,
        file_name: impl Into<String>,
        format: ExportFormat,
        target: Arc<dyn ExportTarget>,
    ) -> Self {
        self.export_file_name = file_name.into();
        self.export_format = format;
        self.export_target = target;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Column header as rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    pub sort_direction: SortDirection,
}

/// One rendered row of the current page
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub id: Option<String>,
    pub selected: bool,
    pub disabled: bool,
    pub cells: Vec<CellContent>,
}

struct ClientRows<R> {
    rows: Arc<Vec<R>>,
    paginator: ClientPaginator,
}

enum Source<R: Send> {
    Client(Mutex<ClientRows<R>>),
    Server(Arc<ServerPaginator<R>>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A data table: column layout, search, sort, pagination, selection and
/// export over either in-memory rows or a paged server source.
///
/// Every operation takes `&self`, so the table stays readable and editable
/// while a server page is in flight. No lock is held across an `.await`.
pub struct EnhancedTable<R: Row + 'static> {
    model: ColumnModel,
    state: Mutex<TableState>,
    selection: Mutex<SelectionState>,
    search_input: Mutex<SearchInput>,
    renderer: CellRenderer<R>,
    source: Source<R>,
    options: TableOptions<R>,
}

impl<R: Row + 'static> EnhancedTable<R> {
    /// Build a table. Fails only on an invalid column model.
    pub fn new(
        columns: Vec<ColumnDescriptor>,
        source: DataSource<R>,
        options: TableOptions<R>,
    ) -> Result<Self> {
        let model = ColumnModel::new(columns)?;
        let state = Self::load_layout(&model, &options);
        let search_input = SearchInput::new(options.search_debounce_ms, state.search_term());
        let renderer = CellRenderer::new()
            .with_render_cell(options.render_cell.clone())
            .with_render_actions(options.render_actions.clone())
            .with_placeholder(options.placeholder.clone());

        let source = match source {
            DataSource::Client(rows) => Source::Client(Mutex::new(ClientRows {
                rows: Arc::new(rows),
                paginator: ClientPaginator::new(options.per_page),
            })),
            DataSource::Server(fetcher) => Source::Server(Arc::new(ServerPaginator::new(
                fetcher,
                options.per_page,
                options.notifier.clone(),
            ))),
        };

        let table = Self {
            model,
            state: Mutex::new(state),
            selection: Mutex::new(SelectionState::new(options.selection_policy)),
            search_input: Mutex::new(search_input),
            renderer,
            source,
            options,
        };
        table.sync_client_total();
        Ok(table)
    }

    fn load_layout(model: &ColumnModel, options: &TableOptions<R>) -> TableState {
        let (Some(store), Some(key)) = (&options.store, &options.storage_key) else {
            return TableState::from_model(model);
        };

        match store.get(key) {
            Ok(Some(value)) => match serde_json::from_value::<LayoutSnapshot>(value) {
                Ok(snapshot) => {
                    debug!("Restored layout for '{}'", key);
                    TableState::restore(model, &snapshot)
                }
                Err(e) => {
                    debug!("Ignoring unreadable layout for '{}': {}", key, e);
                    TableState::from_model(model)
                }
            },
            Ok(None) => TableState::from_model(model),
            Err(e) => {
                warn!("Failed to read layout for '{}': {:#}", key, e);
                TableState::from_model(model)
            }
        }
    }

    fn persist_layout(&self) {
        let (Some(store), Some(key)) = (&self.options.store, &self.options.storage_key) else {
            return;
        };

        let snapshot = lock(&self.state).snapshot();
        let result = serde_json::to_value(snapshot)
            .map_err(anyhow::Error::from)
            .and_then(|value| store.set(key, value));
        match result {
            Ok(()) => debug!("Persisted layout for '{}'", key),
            Err(e) => warn!("Failed to persist layout for '{}': {:#}", key, e),
        }
    }

    /// Keep the client paginator's count in line with the working set
    fn sync_client_total(&self) {
        let Source::Client(client) = &self.source else {
            return;
        };
        let count = self.working_set().row_count();
        lock(client).paginator.set_total(count);
    }

    fn after_state_change(&self, changed: bool) -> bool {
        if changed {
            self.sync_client_total();
            self.persist_layout();
        }
        changed
    }

    fn update_state<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut TableState) -> bool,
    {
        let changed = update(&mut lock(&self.state));
        self.after_state_change(changed)
    }

    /// Server mode: the committed search term is the one whose page is
    /// displayed. A newer request carrying a new term can land through any
    /// page load, so every applied load re-syncs it.
    fn sync_server_search(&self) {
        let Source::Server(server) = &self.source else {
            return;
        };
        let Some(displayed) = server.displayed() else {
            return;
        };
        let changed = lock(&self.state).set_search(&displayed.search_term);
        if changed {
            lock(&self.selection).clear();
            lock(&self.search_input).mark_applied(&displayed.search_term);
            self.after_state_change(true);
        }
    }

    pub fn model(&self) -> &ColumnModel {
        &self.model
    }

    /// Copy of the current search, sort and layout state
    pub fn state(&self) -> TableState {
        lock(&self.state).clone()
    }

    pub fn search_term(&self) -> String {
        lock(&self.state).search_term().to_string()
    }

    pub fn selection(&self) -> SelectionState {
        lock(&self.selection).clone()
    }

    pub fn is_server_mode(&self) -> bool {
        matches!(self.source, Source::Server(_))
    }

    pub fn is_loading(&self) -> bool {
        match &self.source {
            Source::Client(_) => false,
            Source::Server(server) => server.is_loading(),
        }
    }

    pub fn last_error(&self) -> Option<String> {
        match &self.source {
            Source::Client(_) => None,
            Source::Server(server) => server.last_error(),
        }
    }

    // Sorting and column layout

    /// Header click: cycles the sort on sortable columns, ignored otherwise
    pub fn toggle_sort(&self, key: &str) -> bool {
        self.update_state(|state| {
            let changed = state.toggle_sort(&self.model, key);
            if changed {
                debug!(
                    "Sort is now {:?} {:?}",
                    state.sort().key,
                    state.sort().direction
                );
            }
            changed
        })
    }

    pub fn set_sort(&self, key: &str, direction: SortDirection) -> bool {
        self.update_state(|state| state.set_sort(&self.model, key, direction))
    }

    pub fn clear_sort(&self) -> bool {
        self.update_state(|state| state.clear_sort())
    }

    pub fn hide_column(&self, key: &str) -> bool {
        self.update_state(|state| state.hide_column(&self.model, key))
    }

    pub fn show_column(&self, key: &str) -> bool {
        self.update_state(|state| state.show_column(key))
    }

    pub fn toggle_column_visibility(&self, key: &str) -> bool {
        self.update_state(|state| state.toggle_column_visibility(&self.model, key))
    }

    /// Drag `active` onto `over`
    pub fn move_column(&self, active: &str, over: &str) -> bool {
        self.update_state(|state| state.move_column(&self.model, active, over))
    }

    pub fn move_column_left(&self, key: &str) -> bool {
        self.update_state(|state| state.move_column_left(&self.model, key))
    }

    pub fn move_column_right(&self, key: &str) -> bool {
        self.update_state(|state| state.move_column_right(&self.model, key))
    }

    /// Restore model order and default visibility, and store that layout
    pub fn reset_layout(&self) {
        self.update_state(|state| {
            state.reset_layout(&self.model);
            true
        });
        info!("Column layout reset to defaults");
    }

    /// Remove the stored layout without touching the current one
    pub fn clear_persisted_layout(&self) -> Result<()> {
        if let (Some(store), Some(key)) = (&self.options.store, &self.options.storage_key) {
            store.remove(key)?;
        }
        Ok(())
    }

    // Search and pagination. In client mode every change applies at once.

    /// New search term; always returns to page 1. In server mode the term
    /// only becomes the table's term once its first page is applied.
    pub async fn set_search(&self, term: &str) -> FetchOutcome {
        let outcome = match &self.source {
            Source::Client(client) => {
                let changed = lock(&self.state).set_search(term);
                lock(client).paginator.reset();
                self.after_state_change(changed);
                FetchOutcome::Applied
            }
            Source::Server(server) => {
                let outcome = server.set_search(term).await;
                if outcome.is_applied() {
                    // A new server result set replaces every row
                    lock(&self.selection).clear();
                }
                self.sync_server_search();
                outcome
            }
        };
        if outcome.is_applied() {
            lock(&self.search_input).mark_applied(term);
        }
        outcome
    }

    /// Search box keystroke. The term is applied by `poll_search` once
    /// typing has paused for the configured delay.
    pub fn input_search(&self, term: &str) {
        lock(&self.search_input).input(term);
    }

    pub fn search_pending(&self) -> bool {
        lock(&self.search_input).is_pending()
    }

    /// Time until the pending keystrokes settle
    pub fn search_due_in(&self) -> Option<Duration> {
        lock(&self.search_input).time_remaining()
    }

    /// Apply the settled search term. None when nothing has settled yet or
    /// the settled term is the one already applied.
    pub async fn poll_search(&self) -> Option<FetchOutcome> {
        let term = lock(&self.search_input).take_ready()?;
        debug!("Applying debounced search '{}'", term);
        Some(self.set_search(&term).await)
    }

    pub async fn go_to_page(&self, page: usize) -> FetchOutcome {
        let before = self.pagination().current_page;
        let outcome = match &self.source {
            Source::Client(client) => {
                lock(client).paginator.go_to_page(page);
                FetchOutcome::Applied
            }
            Source::Server(server) => server.go_to_page(page).await,
        };
        self.after_page_change(before, &outcome);
        outcome
    }

    pub async fn next_page(&self) -> FetchOutcome {
        let page = self.pagination().current_page + 1;
        self.go_to_page(page).await
    }

    pub async fn prev_page(&self) -> FetchOutcome {
        let page = self.pagination().current_page.saturating_sub(1);
        self.go_to_page(page).await
    }

    /// New page size; always returns to page 1 and keeps the selection.
    /// Sizes outside `per_page_options` are rejected without a request.
    pub async fn set_per_page(&self, per_page: usize) -> FetchOutcome {
        let allowed = &self.options.per_page_options;
        if !allowed.is_empty() && !allowed.contains(&per_page) {
            warn!("Ignoring page size {} (allowed: {:?})", per_page, allowed);
            return FetchOutcome::Rejected(format!("Unsupported page size {}", per_page));
        }

        let before = self.pagination().current_page;
        let outcome = match &self.source {
            Source::Client(client) => {
                lock(client).paginator.set_per_page(per_page.max(1));
                FetchOutcome::Applied
            }
            Source::Server(server) => server.set_per_page(per_page).await,
        };
        self.after_page_change(before, &outcome);
        outcome
    }

    pub fn per_page_options(&self) -> &[usize] {
        &self.options.per_page_options
    }

    /// Re-fetch the requested server page. Selection is cleared because the
    /// row set is replaced; client tables are unaffected.
    pub async fn refresh(&self) -> FetchOutcome {
        let Source::Server(server) = &self.source else {
            return FetchOutcome::Applied;
        };
        let outcome = server.refresh().await;
        if outcome.is_applied() {
            lock(&self.selection).clear();
        }
        self.sync_server_search();
        outcome
    }

    fn after_page_change(&self, before: usize, outcome: &FetchOutcome) {
        if !outcome.is_applied() {
            return;
        }
        self.sync_server_search();
        let after = self.pagination().current_page;
        if before != after && self.options.clear_selection_on_page_change {
            lock(&self.selection).clear();
        }
    }

    /// Swap in a new client-side row set. Selection is cleared.
    pub fn replace_data(&self, rows: Vec<R>) -> Result<()> {
        match &self.source {
            Source::Client(client) => lock(client).rows = Arc::new(rows),
            Source::Server(_) => bail!("replace_data is only available for client-side tables"),
        }
        lock(&self.selection).clear();
        self.sync_client_total();
        Ok(())
    }

    pub fn pagination(&self) -> PaginationState {
        match &self.source {
            Source::Client(client) => lock(client).paginator.state(),
            Source::Server(server) => server.pagination(),
        }
    }

    pub fn page_window(&self) -> Vec<PageItem> {
        let state = self.pagination();
        page_window(
            state.current_page,
            state.total_pages,
            self.options.max_visible_pages,
        )
    }

    // Views

    /// Filtered and sorted rows. Server rows are taken as delivered.
    pub fn working_set(&self) -> DataView<R> {
        match &self.source {
            Source::Client(client) => {
                let rows = lock(client).rows.clone();
                let state = lock(&self.state);
                compute_working_set(rows, &state, &self.model, &self.renderer)
            }
            Source::Server(server) => DataView::new(server.rows()),
        }
    }

    /// Rows of the current page
    pub fn page_view(&self) -> DataView<R> {
        match &self.source {
            Source::Client(client) => {
                let paginator = lock(client).paginator.clone();
                paginator.page_of(self.working_set())
            }
            Source::Server(_) => self.working_set(),
        }
    }

    /// Visible columns in display order that produce output
    pub fn visible_columns(&self) -> Vec<&ColumnDescriptor> {
        let visible = lock(&self.state).visible_columns(&self.model);
        self.renderer.renderable_columns(&visible)
    }

    pub fn header(&self) -> Vec<HeaderCell> {
        let sort = lock(&self.state).sort().clone();
        self.visible_columns()
            .into_iter()
            .map(|c| HeaderCell {
                key: c.key.clone(),
                label: c.label.clone(),
                sortable: c.sortable,
                sort_direction: sort.direction_for(&c.key),
            })
            .collect()
    }

    pub fn render_page(&self) -> Vec<RenderedRow> {
        let columns = self.visible_columns();
        let page = self.page_view();
        let selection = lock(&self.selection);
        page.rows()
            .into_iter()
            .map(|row| {
                let id = self.row_id(row);
                RenderedRow {
                    selected: id.as_deref().is_some_and(|id| selection.is_selected(id)),
                    disabled: self.is_disabled(row),
                    cells: columns
                        .iter()
                        .map(|c| self.renderer.render_cell(row, &c.key))
                        .collect(),
                    id,
                }
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.page_view().is_empty()
    }

    pub fn empty_message(&self) -> &str {
        &self.options.empty_message
    }

    /// Plain-text rendering of the current page
    pub fn pretty_print(&self) -> String {
        let page = self.page_view();
        if page.is_empty() {
            return self.options.empty_message.clone();
        }

        let columns: Vec<&ColumnDescriptor> = self
            .visible_columns()
            .into_iter()
            .filter(|c| !c.is_actions())
            .collect();

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(
            columns
                .iter()
                .map(|c| Cell::new(&c.label).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
        for row in page.rows() {
            table.add_row(
                columns
                    .iter()
                    .map(|c| self.renderer.display_text(row, &c.key))
                    .collect::<Vec<_>>(),
            );
        }
        table.to_string()
    }

    // Selection

    fn row_id(&self, row: &R) -> Option<String> {
        match &self.options.get_item_id {
            Some(get_item_id) => Some(get_item_id(row)),
            None => row.row_id(),
        }
    }

    fn is_disabled(&self, row: &R) -> bool {
        self.options
            .is_row_disabled
            .as_ref()
            .is_some_and(|is_disabled| is_disabled(row))
    }

    fn selectable_ids(&self, view: &DataView<R>) -> Vec<String> {
        view.rows()
            .into_iter()
            .filter(|row| !self.is_disabled(row))
            .filter_map(|row| self.row_id(row))
            .collect()
    }

    /// Ids on the current page that can be selected
    pub fn page_ids(&self) -> Vec<String> {
        self.selectable_ids(&self.page_view())
    }

    /// Row checkbox. `on_select_row` fires only when the selection changed.
    pub fn select_row(&self, id: &str, checked: bool) -> bool {
        let page_ids = self.page_ids();
        let changed = lock(&self.selection).select_row(id, checked, &page_ids);
        if changed {
            self.persist_layout();
            if let Some(on_select_row) = &self.options.on_select_row {
                on_select_row(id, checked);
            }
        }
        changed
    }

    /// Header checkbox. Scoped to the current page unless the table selects
    /// across pages. `on_select_all` fires only when the selection changed.
    pub fn select_all(&self, checked: bool) -> bool {
        let page_ids = self.page_ids();
        let policy = lock(&self.selection).policy();
        let all_ids = match (&self.source, policy) {
            (Source::Client(_), SelectionPolicy::AcrossPages) => {
                self.selectable_ids(&self.working_set())
            }
            _ => page_ids.clone(),
        };

        let (changed, selected) = {
            let mut selection = lock(&self.selection);
            let changed = selection.select_all(checked, &page_ids, &all_ids);
            (changed, selection.len())
        };
        if changed {
            debug!("Selection now holds {} rows", selected);
            self.persist_layout();
            if let Some(on_select_all) = &self.options.on_select_all {
                on_select_all(checked);
            }
        }
        changed
    }

    pub fn select_all_state(&self) -> SelectAllState {
        let page_ids = self.page_ids();
        lock(&self.selection).header_state(&page_ids)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        lock(&self.selection).selected_ids()
    }

    pub fn clear_selection(&self) -> bool {
        lock(&self.selection).clear()
    }

    /// Selected rows resolved against the loaded rows, in source order
    pub fn selected_view(&self) -> DataView<R> {
        let source = match &self.source {
            Source::Client(client) => lock(client).rows.clone(),
            Source::Server(server) => server.rows(),
        };
        let indices = {
            let selection = lock(&self.selection);
            source
                .iter()
                .enumerate()
                .filter(|(_, row)| {
                    self.row_id(row)
                        .is_some_and(|id| selection.is_selected(&id))
                })
                .map(|(i, _)| i)
                .collect()
        };
        DataView::new(source).with_rows(indices)
    }

    pub fn bulk_actions_visible(&self) -> bool {
        lock(&self.selection).bulk_actions_visible()
    }

    pub fn bulk_actions(&self) -> &[BulkAction<R>] {
        &self.options.bulk_actions
    }

    /// Run the named bulk action over the selected rows. Returns how many
    /// rows it received; nothing runs while the selection is empty.
    pub fn run_bulk_action(&self, label: &str) -> Result<usize> {
        let action = self
            .options
            .bulk_actions
            .iter()
            .find(|a| a.label == label)
            .ok_or_else(|| anyhow!("Unknown bulk action '{}'", label))?;

        let empty = lock(&self.selection).is_empty();
        if empty {
            return Ok(0);
        }
        let view = self.selected_view();
        let rows = view.rows();
        action.invoke(&rows);
        Ok(rows.len())
    }

    /// Invoke the row-click callback for the row with `id` on this page
    pub fn click_row(&self, id: &str) -> bool {
        let Some(on_row_click) = &self.options.on_row_click else {
            return false;
        };
        let page = self.page_view();
        match page
            .rows()
            .into_iter()
            .find(|row| self.row_id(row).as_deref() == Some(id))
        {
            Some(row) => {
                on_row_click(row);
                true
            }
            None => false,
        }
    }

    // Export

    /// Export with the configured file name and format. Errors are reported
    /// through the notifier and nothing is written.
    pub async fn export(&self, scope: ExportScope) -> Option<ExportSummary> {
        let result = self.export_rows(scope).await;
        match result {
            Ok(summary) => {
                info!(
                    "Exported {} rows to {:?}",
                    summary.row_count, summary.path
                );
                self.options.notifier.success(&format!(
                    "Exported {} rows to {}",
                    summary.row_count,
                    summary.path.display()
                ));
                Some(summary)
            }
            Err(e) => {
                warn!("Export failed: {:#}", e);
                self.options.notifier.error(&format!("{:#}", e));
                None
            }
        }
    }

    async fn export_rows(&self, scope: ExportScope) -> Result<ExportSummary> {
        let fetched = match (&self.source, scope) {
            (Source::Server(server), ExportScope::AllPages) => Some(server.fetch_all().await?),
            _ => None,
        };

        let columns = self.visible_columns();
        let view = self.working_set();
        let rows: Vec<&R> = match &fetched {
            Some(all) => all.iter().collect(),
            None => view.rows(),
        };

        DataExporter::export(
            &rows,
            &columns,
            &self.renderer,
            self.options.export_format,
            &self.options.export_file_name,
            self.options.export_target.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationLog;
    use crate::storage::MemoryStore;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", "ID"),
            ColumnDescriptor::new("name", "Name"),
            ColumnDescriptor::new("status", "Status").with_sortable(false),
            ColumnDescriptor::actions("Actions"),
        ]
    }

    fn rows(n: usize) -> Vec<Value> {
        (1..=n)
            .map(|i| json!({"id": i, "name": format!("Society {}", i), "status": i % 2}))
            .collect()
    }

    fn client_table(n: usize) -> EnhancedTable<Value> {
        EnhancedTable::new(columns(), DataSource::Client(rows(n)), TableOptions::default())
            .unwrap()
    }

    #[test]
    fn test_duplicate_columns_are_rejected() {
        let mut cols = columns();
        cols.push(ColumnDescriptor::new("id", "Again"));
        let result =
            EnhancedTable::<Value>::new(cols, DataSource::Client(vec![]), TableOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_actions_column_hidden_without_callback() {
        let table = client_table(3);
        let header = table.header();
        let keys: Vec<&str> = header.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "status"]);
    }

    #[test]
    fn test_sort_on_non_sortable_column_is_ignored() {
        let table = client_table(3);
        assert!(!table.toggle_sort("status"));
        assert!(!table.state().sort().is_active());

        assert!(table.toggle_sort("id"));
        assert!(table.toggle_sort("id"));
        let first = table.page_view().get_row(0).cloned().unwrap();
        assert_eq!(first["id"], json!(3));
    }

    #[tokio::test]
    async fn test_search_resets_page() {
        let table = client_table(25);
        table.go_to_page(3).await;
        assert_eq!(table.pagination().current_page, 3);

        table.set_search("society 1").await;
        let state = table.pagination();
        assert_eq!(state.current_page, 1);
        // "Society 1" and "Society 10".."Society 19"
        assert_eq!(state.total_count, 11);
        assert_eq!(state.total_pages, 2);
    }

    #[tokio::test]
    async fn test_selection_survives_page_size_change() {
        let table = client_table(25);
        assert!(table.select_all(true));
        assert_eq!(table.selected_ids().len(), 10);
        assert_eq!(table.select_all_state(), SelectAllState::Checked);

        table.set_per_page(25).await;
        assert_eq!(table.selected_ids().len(), 10);
        assert_eq!(table.select_all_state(), SelectAllState::Indeterminate);
    }

    #[test]
    fn test_disabled_rows_cannot_be_selected() {
        let options = TableOptions::default().with_row_disabled(|row: &Value| row["status"] == json!(0));
        let table =
            EnhancedTable::new(columns(), DataSource::Client(rows(4)), options).unwrap();

        assert!(!table.select_row("2", true));
        assert!(table.select_all(true));
        assert_eq!(table.selected_ids(), vec!["1".to_string(), "3".to_string()]);
        assert_eq!(table.select_all_state(), SelectAllState::Checked);
    }

    #[test]
    fn test_bulk_action_receives_selected_rows() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = TableOptions::default().with_bulk_action("Delete", move |rows: &[&Value]| {
            sink.lock()
                .unwrap()
                .extend(rows.iter().map(|r| r["id"].clone()));
        });
        let table =
            EnhancedTable::new(columns(), DataSource::Client(rows(5)), options).unwrap();

        assert!(!table.bulk_actions_visible());
        assert_eq!(table.run_bulk_action("Delete").unwrap(), 0);

        table.select_row("4", true);
        table.select_row("2", true);
        assert!(table.bulk_actions_visible());
        assert_eq!(table.run_bulk_action("Delete").unwrap(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![json!(2), json!(4)]);
        assert!(table.run_bulk_action("Archive").is_err());
    }

    #[test]
    fn test_row_click_and_empty_message() {
        let clicked = Arc::new(Mutex::new(None));
        let sink = clicked.clone();
        let options = TableOptions::default()
            .with_row_click(move |row: &Value| *sink.lock().unwrap() = Some(row["id"].clone()))
            .with_empty_message("No societies yet");
        let table =
            EnhancedTable::new(columns(), DataSource::Client(rows(2)), options).unwrap();

        assert!(table.click_row("2"));
        assert!(!table.click_row("9"));
        assert_eq!(*clicked.lock().unwrap(), Some(json!(2)));

        table.replace_data(vec![]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.pretty_print(), "No societies yet");
    }

    #[test]
    fn test_layout_restored_from_store() {
        let store: Arc<dyn LayoutStore> = Arc::new(MemoryStore::new());
        store
            .set(
                "societies",
                json!({"column_order": ["name", "gone", "id"], "hidden_columns": ["status", "gone"]}),
            )
            .unwrap();

        let options = TableOptions::default().with_storage("societies", store.clone());
        let table =
            EnhancedTable::new(columns(), DataSource::Client(rows(2)), options).unwrap();
        let header = table.header();
        let keys: Vec<&str> = header.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "id"]);

        table.show_column("status");
        let stored: LayoutSnapshot =
            serde_json::from_value(store.get("societies").unwrap().unwrap()).unwrap();
        assert!(stored.hidden_columns.is_empty());

        table.clear_persisted_layout().unwrap();
        assert!(store.get("societies").unwrap().is_none());
    }

    #[test]
    fn test_pretty_print_uses_labels() {
        let table = client_table(2);
        let text = table.pretty_print();
        assert!(text.contains("Name"));
        assert!(text.contains("Society 2"));
        assert!(!text.contains("Actions"));
    }

    #[tokio::test]
    async fn test_export_error_is_notified() {
        let log = NotificationLog::new();
        let options = TableOptions::default().with_notifier(Arc::new(log.clone()));
        let table =
            EnhancedTable::new(columns(), DataSource::Client(rows(3)), options).unwrap();
        table.set_search("no such society").await;

        assert!(table.export(ExportScope::Visible).await.is_none());
        let errors = log.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "No data to export");
    }

    #[test]
    fn test_selection_callbacks_fire_only_on_change() {
        let rows_seen = Arc::new(Mutex::new(Vec::new()));
        let all_seen = Arc::new(Mutex::new(Vec::new()));
        let row_sink = rows_seen.clone();
        let all_sink = all_seen.clone();
        let options = TableOptions::default()
            .with_row_disabled(|row: &Value| row["id"] == json!(4))
            .with_on_select_row(move |id: &str, checked: bool| {
                row_sink.lock().unwrap().push((id.to_string(), checked));
            })
            .with_on_select_all(move |checked: bool| all_sink.lock().unwrap().push(checked));
        let table = EnhancedTable::new(columns(), DataSource::Client(rows(4)), options).unwrap();

        assert!(table.select_row("2", true));
        // Already selected, disabled, and never selected: nothing changes
        assert!(!table.select_row("2", true));
        assert!(!table.select_row("4", true));
        assert!(!table.select_row("3", false));
        assert!(table.select_row("2", false));
        assert_eq!(
            *rows_seen.lock().unwrap(),
            vec![("2".to_string(), true), ("2".to_string(), false)]
        );

        assert!(table.select_all(true));
        assert!(!table.select_all(true));
        assert!(table.select_all(false));
        assert!(!table.select_all(false));
        assert_eq!(*all_seen.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_unlisted_page_size_is_rejected() {
        let table = EnhancedTable::new(
            columns(),
            DataSource::Client(rows(30)),
            TableOptions::default().with_per_page_options(vec![10, 20]),
        )
        .unwrap();
        table.go_to_page(2).await;

        let outcome = table.set_per_page(7).await;
        assert!(matches!(outcome, FetchOutcome::Rejected(_)));
        let state = table.pagination();
        assert_eq!(state.per_page, 10);
        assert_eq!(state.current_page, 2);

        assert_eq!(table.set_per_page(20).await, FetchOutcome::Applied);
        assert_eq!(table.pagination().per_page, 20);
        assert_eq!(table.per_page_options(), &[10, 20]);
    }

    #[tokio::test]
    async fn test_search_input_waits_for_quiet_period() {
        let options = TableOptions::default().with_search_debounce(60_000);
        let table = EnhancedTable::new(columns(), DataSource::Client(rows(25)), options).unwrap();

        table.input_search("society 1");
        assert!(table.search_pending());
        assert!(table.search_due_in().is_some());
        assert!(table.poll_search().await.is_none());
        assert_eq!(table.search_term(), "");
        assert_eq!(table.pagination().total_count, 25);
    }

    #[tokio::test]
    async fn test_settled_search_input_is_applied_once() {
        let options = TableOptions::default().with_search_debounce(0);
        let table = EnhancedTable::new(columns(), DataSource::Client(rows(25)), options).unwrap();
        table.go_to_page(2).await;

        table.input_search("society");
        table.input_search("society 2");
        assert_eq!(table.poll_search().await, Some(FetchOutcome::Applied));
        assert_eq!(table.search_term(), "society 2");
        // "Society 2" and "Society 20".."Society 25"
        assert_eq!(table.pagination().total_count, 7);
        assert_eq!(table.pagination().current_page, 1);

        table.input_search("society 2");
        assert!(table.poll_search().await.is_none());
        assert!(!table.search_pending());
    }
}
