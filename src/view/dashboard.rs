//! Built-in role dashboard
//!
//! One generic dashboard rendered from the role catalog. Per-role state
//! (visit count, notes, open sector) lives in the role's scoped storage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::role::{RoleId, RoleRegistry, SectorId};

use super::{RoleView, ViewContext, ViewFactory, ViewFrame, ViewUpdate};

const VISITS_KEY: &str = "visits";
const NOTES_KEY: &str = "notes";
const SECTOR_KEY: &str = "open-sector";
const MOUNTED_AT_KEY: &str = "last-mounted-at";
const UNMOUNTED_AT_KEY: &str = "last-unmounted-at";

/// Factory for [`DashboardView`]
pub struct DashboardFactory {
    catalog: Arc<RoleRegistry>,
}

impl DashboardFactory {
    pub fn new(catalog: Arc<RoleRegistry>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ViewFactory for DashboardFactory {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    async fn load(&self, role: RoleId) -> Result<Box<dyn RoleView>> {
        let config = self.catalog.get(role);
        debug!(role = %role, sectors = config.sector_access.len(), "Dashboard loaded");
        Ok(Box::new(DashboardView { role }))
    }
}

/// Generic dashboard for any role
pub struct DashboardView {
    role: RoleId,
}

impl RoleView for DashboardView {
    fn role(&self) -> RoleId {
        self.role
    }

    fn mount(&mut self, ctx: &ViewContext) -> Result<()> {
        let visits = ctx.storage.get::<u64>(VISITS_KEY)?.unwrap_or(0) + 1;
        ctx.storage.set(VISITS_KEY, &visits)?;
        ctx.storage.set(MOUNTED_AT_KEY, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    fn update(&mut self, ctx: &ViewContext, update: &ViewUpdate) -> Result<()> {
        match update.action.as_str() {
            "note" => {
                let text = update
                    .payload
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let mut notes = ctx.storage.get::<Vec<String>>(NOTES_KEY)?.unwrap_or_default();
                notes.push(text);
                ctx.storage.set(NOTES_KEY, &notes)?;
            }
            "clear-notes" => {
                ctx.storage.remove(NOTES_KEY)?;
            }
            "open-sector" => {
                let sector = SectorId::new(
                    update
                        .payload
                        .get("sector")
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                );
                if ctx.config.can_access(&sector) {
                    ctx.storage.set(SECTOR_KEY, &sector)?;
                } else {
                    warn!(role = %self.role, sector = %sector, "Sector not accessible for role");
                }
            }
            other => debug!(role = %self.role, action = other, "Ignoring unknown dashboard action"),
        }
        Ok(())
    }

    fn render(&self, ctx: &ViewContext) -> Result<ViewFrame> {
        let display = &ctx.config.display;
        let sectors: Vec<&str> = ctx.config.sector_access.iter().map(SectorId::as_str).collect();

        Ok(ViewFrame {
            role: self.role,
            epoch: ctx.epoch,
            title: display.name.clone(),
            body: json!({
                "description": display.description,
                "icon": display.icon,
                "accent": display.accent,
                "sectors": sectors,
                "can_monitor": ctx.config.can_monitor,
                "visits": ctx.storage.get::<u64>(VISITS_KEY)?.unwrap_or(0),
                "notes": ctx.storage.get::<Vec<String>>(NOTES_KEY)?.unwrap_or_default(),
                "open_sector": ctx.storage.get::<String>(SECTOR_KEY)?,
            }),
        })
    }

    fn unmount(&mut self, ctx: &ViewContext) -> Result<()> {
        ctx.storage.set(UNMOUNTED_AT_KEY, &Utc::now().to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageNamespace};

    fn context(role: RoleId, storage: &StorageNamespace, catalog: &RoleRegistry) -> ViewContext {
        ViewContext {
            role,
            epoch: 1,
            identity: "user-1".to_string(),
            config: catalog.get(role).clone(),
            storage: storage.scoped(role, Some("user-1")),
        }
    }

    #[tokio::test]
    async fn test_dashboard_lifecycle_persists_state() {
        let catalog = Arc::new(RoleRegistry::bundled().unwrap());
        let storage = StorageNamespace::new("test", Arc::new(MemoryStore::new()));
        let factory = DashboardFactory::new(catalog.clone());
        let ctx = context(RoleId::Farmer, &storage, &catalog);

        let mut view = factory.load(RoleId::Farmer).await.unwrap();
        view.mount(&ctx).unwrap();
        view.update(&ctx, &ViewUpdate::new("note", json!({"text": "rain due"})))
            .unwrap();
        view.update(&ctx, &ViewUpdate::new("open-sector", json!({"sector": "agriculture"})))
            .unwrap();

        let frame = view.render(&ctx).unwrap();
        assert_eq!(frame.role, RoleId::Farmer);
        assert_eq!(frame.body["visits"], json!(1));
        assert_eq!(frame.body["notes"], json!(["rain due"]));
        assert_eq!(frame.body["open_sector"], json!("agriculture"));
        view.unmount(&ctx).unwrap();

        assert!(storage
            .role_keys(RoleId::Farmer)
            .unwrap()
            .iter()
            .all(|k| k.starts_with("test:farmer:user-1:")));
    }

    #[tokio::test]
    async fn test_dashboard_refuses_foreign_sector() {
        let catalog = Arc::new(RoleRegistry::bundled().unwrap());
        let storage = StorageNamespace::new("test", Arc::new(MemoryStore::new()));
        let ctx = context(RoleId::Student, &storage, &catalog);

        let mut view = DashboardFactory::new(catalog.clone())
            .load(RoleId::Student)
            .await
            .unwrap();
        view.mount(&ctx).unwrap();
        view.update(&ctx, &ViewUpdate::new("open-sector", json!({"sector": "agriculture"})))
            .unwrap();

        let frame = view.render(&ctx).unwrap();
        assert_eq!(frame.body["open_sector"], Value::Null);
    }

    #[tokio::test]
    async fn test_visits_accumulate_across_mounts() {
        let catalog = Arc::new(RoleRegistry::bundled().unwrap());
        let storage = StorageNamespace::new("test", Arc::new(MemoryStore::new()));
        let factory = DashboardFactory::new(catalog.clone());
        let ctx = context(RoleId::Citizen, &storage, &catalog);

        for _ in 0..3 {
            let mut view = factory.load(RoleId::Citizen).await.unwrap();
            view.mount(&ctx).unwrap();
            view.unmount(&ctx).unwrap();
        }

        let view = factory.load(RoleId::Citizen).await.unwrap();
        assert_eq!(view.render(&ctx).unwrap().body["visits"], json!(3));
    }
}
