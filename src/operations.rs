/// Tab operations: window sorting and splitting groups into new windows

use crate::compare::sorted_tabs;
use crate::grouping::GroupEntry;
use crate::host::{HostError, MoveProperties, PreferenceStore, TabInventory, TabMover, TabQuery};
use crate::storage::Preferences;
use crate::tab_data::{Tab, TabId, WindowId};
use log::{debug, info};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("stopped after {completed} of {total} tab operations: {source}")]
    Interrupted {
        completed: usize,
        total: usize,
        #[source]
        source: HostError,
    },
    #[error("tab {0} has no window to be appended to")]
    NoTargetWindow(TabId),
    #[error("window {0} is already being rearranged")]
    WindowBusy(WindowId),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// One step of a tab rearrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabTask {
    /// Move within its window to `index`.
    Reorder { tab: TabId, index: i32 },
    /// Open a new window holding `seed`; later `Append`s go there.
    OpenWindow { seed: TabId },
    /// Move to the end of the most recently opened window.
    Append { tab: TabId },
}

/// Move every tab of a window to its sorted position.
///
/// Pinned tabs are left alone when the preference says to keep them.
pub fn plan_window_sort(tabs: &[Tab], preferences: &Preferences) -> Vec<TabTask> {
    sorted_tabs(tabs)
        .iter()
        .enumerate()
        .filter(|(_, tab)| !(tab.pinned && preferences.keep_pinned))
        .map(|(index, tab)| TabTask::Reorder {
            tab: tab.id,
            index: index as i32,
        })
        .collect()
}

/// Sort first, then seed a new window with the first tab and append the rest.
pub fn plan_partition(tabs: &[Tab]) -> Vec<TabTask> {
    let sorted = sorted_tabs(tabs);
    let Some((seed, rest)) = sorted.split_first() else {
        return Vec::new();
    };

    std::iter::once(TabTask::OpenWindow { seed: seed.id })
        .chain(rest.iter().map(|tab| TabTask::Append { tab: tab.id }))
        .collect()
}

/// Run tasks strictly one after another, stopping at the first failure.
///
/// Returns the last window opened, if any.
pub async fn run_tasks<M: TabMover>(
    mover: &M,
    tasks: &[TabTask],
) -> Result<Option<WindowId>, OperationError> {
    let mut window = None;

    for (completed, task) in tasks.iter().enumerate() {
        let interrupted = |source| OperationError::Interrupted {
            completed,
            total: tasks.len(),
            source,
        };

        match *task {
            TabTask::Reorder { tab, index } => mover
                .move_tab(tab, MoveProperties::to_index(index))
                .await
                .map_err(interrupted)?,
            TabTask::OpenWindow { seed } => {
                window = Some(mover.create_window(seed).await.map_err(interrupted)?);
            }
            TabTask::Append { tab } => {
                let window_id = window.ok_or(OperationError::NoTargetWindow(tab))?;
                mover
                    .move_tab(tab, MoveProperties::append_to(window_id))
                    .await
                    .map_err(interrupted)?;
            }
        }
    }

    Ok(window)
}

/// Sort the tabs of the current window in place.
///
/// Returns the number of tabs moved.
pub async fn sort_window<H>(host: &H, busy: &BusyWindows) -> Result<usize, OperationError>
where
    H: TabInventory + TabMover + PreferenceStore,
{
    let preferences = host.load_preferences().await?;
    let tabs = host.query_tabs(&TabQuery::current_window()).await?;
    let Some(window_id) = tabs.first().map(|tab| tab.window_id) else {
        debug!("current window has no tabs to sort");
        return Ok(0);
    };

    let _claim = busy
        .try_claim(window_id)
        .ok_or(OperationError::WindowBusy(window_id))?;
    let tasks = plan_window_sort(&tabs, &preferences);
    run_tasks(host, &tasks).await?;

    info!("sorted {} tabs in window {}", tasks.len(), window_id);
    Ok(tasks.len())
}

/// Move a group's tabs into a new window, in sorted order.
pub async fn partition<M: TabMover>(
    mover: &M,
    entry: &GroupEntry,
    busy: &BusyWindows,
) -> Result<Option<WindowId>, OperationError> {
    let reference_window = entry.reference_window();
    let _claim = busy
        .try_claim(reference_window)
        .ok_or(OperationError::WindowBusy(reference_window))?;

    let tasks = plan_partition(entry.tabs());
    let window = run_tasks(mover, &tasks).await?;

    info!(
        "moved {} tabs of {} into window {:?}",
        tasks.len(),
        entry.label(),
        window
    );
    Ok(window)
}

/// Windows with a rearrangement in progress.
#[derive(Debug, Clone, Default)]
pub struct BusyWindows {
    windows: Rc<RefCell<HashSet<WindowId>>>,
}

impl BusyWindows {
    pub fn new() -> BusyWindows {
        BusyWindows::default()
    }

    /// `None` while another claim on `window_id` is alive.
    pub fn try_claim(&self, window_id: WindowId) -> Option<WindowClaim> {
        if !self.windows.borrow_mut().insert(window_id) {
            return None;
        }
        Some(WindowClaim {
            windows: Rc::clone(&self.windows),
            window_id,
        })
    }

    pub fn is_busy(&self, window_id: WindowId) -> bool {
        self.windows.borrow().contains(&window_id)
    }
}

/// Releases its window when dropped.
#[derive(Debug)]
pub struct WindowClaim {
    windows: Rc<RefCell<HashSet<WindowId>>>,
    window_id: WindowId,
}

impl Drop for WindowClaim {
    fn drop(&mut self) {
        self.windows.borrow_mut().remove(&self.window_id);
    }
}
