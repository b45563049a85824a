/// Background script: toolbar sort, grouping menu and window splitting
use crate::extension::ExtensionApi;
use crate::grouping::{GroupError, GroupSession, SessionSlot, build_session};
use crate::menu::{root_item, session_items};
use crate::operations::{BusyWindows, partition, sort_window};
use crate::tab_data::Tab;
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;
use wasm_bindgen_futures::spawn_local;

pub struct Background<A> {
    api: A,
    sessions: RefCell<SessionSlot>,
    busy: BusyWindows,
}

impl<A: ExtensionApi> Background<A> {
    fn new(api: A) -> Background<A> {
        Background {
            api,
            sessions: RefCell::new(SessionSlot::new()),
            busy: BusyWindows::new(),
        }
    }

    /// Register the extension's listeners; they live for the whole script.
    pub fn install(api: A) {
        let background = Rc::new(Background::new(api));

        let on_toolbar = Rc::clone(&background);
        background.api.on_toolbar_clicked(Rc::new(move || {
            let background = Rc::clone(&on_toolbar);
            spawn_local(async move { background.sort_current_window().await });
        }));

        let on_context = Rc::clone(&background);
        background.api.on_menu_context(Rc::new(move |tab: Tab| {
            let background = Rc::clone(&on_context);
            spawn_local(async move { background.rebuild_menu(tab).await });
        }));

        let on_click = Rc::clone(&background);
        background.api.on_menu_clicked(Rc::new(move |menu_item_id: String| {
            let background = Rc::clone(&on_click);
            spawn_local(async move { background.open_group(menu_item_id).await });
        }));

        info!("background listeners installed");
    }

    async fn sort_current_window(&self) {
        match sort_window(&self.api, &self.busy).await {
            Ok(moved) => debug!("toolbar sort moved {} tabs", moved),
            Err(e) => error!("sorting window failed: {}", e),
        }
    }

    /// Replace the menu with the groups for `tab`; always finishes with a
    /// refresh so an open menu never stays half built.
    async fn rebuild_menu(&self, tab: Tab) {
        let session = self.sessions.borrow_mut().begin();

        if let Err(e) = self.populate_menu(&tab, session).await {
            error!("building group menu for tab {} failed: {}", tab.id, e);
        }
        if let Err(e) = self.api.refresh_menu().await {
            warn!("menu refresh failed: {}", e);
        }
    }

    /// Whether the build that produced `token` is still the latest one.
    fn is_latest(&self, token: Uuid) -> bool {
        self.sessions.borrow().is_pending(token)
    }

    async fn populate_menu(&self, tab: &Tab, session: GroupSession) -> Result<(), GroupError> {
        let token = session.token();
        self.api.reset_menu().await?;
        // A newer build reset the menu after us and owns it now.
        if !self.is_latest(token) {
            debug!("menu rebuild for tab {} superseded before it started", tab.id);
            return Ok(());
        }
        self.api.create_menu_item(&root_item())?;

        let session = match build_session(tab, session, &self.api).await {
            Ok(session) => session,
            Err(GroupError::NoHost(e)) => {
                debug!("no groups for tab {}: {}", tab.id, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if !self.is_latest(token) {
            debug!("menu rebuild for tab {} superseded", tab.id);
            return Ok(());
        }
        for item in session_items(&session) {
            self.api.create_menu_item(&item)?;
        }
        self.sessions.borrow_mut().install(session);
        Ok(())
    }

    async fn open_group(&self, menu_item_id: String) {
        let Some(entry) = self.sessions.borrow().resolve(&menu_item_id).cloned() else {
            debug!("menu item {} has no group", menu_item_id);
            return;
        };

        match partition(&self.api, &entry, &self.busy).await {
            Ok(window) => debug!("group {} now in window {:?}", entry.label(), window),
            Err(e) => error!("moving group {} failed: {}", entry.label(), e),
        }
    }
}
