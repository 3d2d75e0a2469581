use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fontmgr_core::{
    CatalogSource, Config, CoreError, FontEvent, FontManager, InstallStatus, JsonFavoriteStore,
    Locale, MemoryFetcher,
};
use fontmgr_registrar::{MemoryStore, NullLoader, RegistrationStore, StoreRegistrar};
use fontmgr_types::RegistrationScope;
use futures::future::join_all;
use serde_json::json;

const CATALOG_URL: &str = "https://example/catalog.json";
const FONT_BYTES: &[u8] = b"\x00\x01\x00\x00fake-truetype";

type TestRegistrar = StoreRegistrar<MemoryStore, NullLoader>;

struct Harness {
    root: PathBuf,
    config: Config,
    fetcher: Arc<MemoryFetcher>,
    registrar: Arc<TestRegistrar>,
    manager: FontManager,
}

impl Harness {
    fn new(fetcher: MemoryFetcher, store: MemoryStore, load_to_ram: bool) -> Self {
        let root = std::env::temp_dir().join(format!("fontmgr_pipeline_{}", uuid::Uuid::new_v4()));
        let config = Config::rooted(root.join("data"), root.join("ram")).with_load_to_ram(load_to_ram);
        Self::with_config(root, config, fetcher, store)
    }

    fn with_config(root: PathBuf, config: Config, fetcher: MemoryFetcher, store: MemoryStore) -> Self {
        let fetcher = Arc::new(fetcher);
        let registrar = Arc::new(StoreRegistrar::new(
            Arc::new(store),
            Arc::new(NullLoader::new()),
            root.join("user-fonts"),
        ));
        let manager = FontManager::builder(config.clone())
            .fetcher(fetcher.clone())
            .registrar(registrar.clone())
            .build();
        Self {
            root,
            config,
            fetcher,
            registrar,
            manager,
        }
    }

    fn user_dir(&self) -> PathBuf {
        self.root.join("user-fonts")
    }

    fn user_entries(&self) -> Vec<fontmgr_types::RegistrationEntry> {
        self.registrar
            .store()
            .entries(RegistrationScope::User)
            .unwrap()
    }

    async fn load(&self) -> usize {
        let source = CatalogSource::Mirror {
            url: CATALOG_URL.to_owned(),
        };
        self.manager.refresh_catalog(&source).await
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.root).ok();
    }
}

fn catalog(fonts: &[(&str, &str)]) -> Vec<u8> {
    let items: Vec<_> = fonts
        .iter()
        .map(|(family, url)| {
            json!({
                "family": family,
                "category": "sans-serif",
                "subsets": ["latin"],
                "files": { "regular": url },
                "version": "v1",
            })
        })
        .collect();
    serde_json::to_vec(&json!({ "items": items })).unwrap()
}

fn fetcher_with(fonts: &[(&str, &str)]) -> MemoryFetcher {
    let fetcher = MemoryFetcher::new().with_resource(CATALOG_URL, catalog(fonts));
    for (_, url) in fonts {
        fetcher.insert(*url, FONT_BYTES);
    }
    fetcher
}

fn assert_file(path: &Path) {
    assert!(path.is_file(), "expected file at {}", path.display());
}

#[tokio::test]
async fn install_then_uninstall_noto_sans() {
    let fonts = [("Noto Sans", "https://example/noto.ttf")];
    let h = Harness::new(fetcher_with(&fonts), MemoryStore::new(), false);
    assert_eq!(h.load().await, 1);

    let item = h.manager.item("Noto Sans").unwrap();
    assert_eq!(item.status(), InstallStatus::NotInstalled);

    assert_eq!(h.manager.install("Noto Sans").await.unwrap(), InstallStatus::Installed);
    assert_file(&h.config.permanent_dir().join("Noto_Sans.ttf"));

    let entries = h.user_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "Noto Sans (TrueType)");
    assert!(entries[0].path.starts_with(h.user_dir()));
    assert_file(&entries[0].path);
    assert!(item.is_uninstallable());
    assert!(item.can_uninstall());
    assert_eq!(h.registrar.loader().loads(), 1);

    let installed_path = entries[0].path.clone();
    assert_eq!(h.manager.uninstall("Noto Sans").await.unwrap(), InstallStatus::NotInstalled);
    assert!(h.user_entries().is_empty());
    assert!(!installed_path.exists());
    assert!(!item.is_uninstallable());
    assert!(!item.can_uninstall());

    // The preview falls back to the cached copy.
    let preview = item.preview().unwrap();
    assert_eq!(preview.path(), h.config.permanent_dir().join("Noto_Sans.ttf"));
    assert_eq!(h.fetcher.request_count(), 2, "catalog + one binary");
}

#[tokio::test]
async fn second_install_is_a_noop() {
    let fonts = [("Roboto", "https://example/roboto.ttf")];
    let h = Harness::new(fetcher_with(&fonts), MemoryStore::new(), false);
    h.load().await;

    assert_eq!(h.manager.install("roboto").await.unwrap(), InstallStatus::Installed);
    let requests = h.fetcher.request_count();
    let loads = h.registrar.loader().loads();

    assert_eq!(h.manager.install("Roboto").await.unwrap(), InstallStatus::Installed);
    assert_eq!(h.fetcher.request_count(), requests);
    assert_eq!(h.registrar.loader().loads(), loads);
    assert_eq!(h.user_entries().len(), 1);
}

#[tokio::test]
async fn downloads_never_exceed_the_gate() {
    let fonts: Vec<(String, String)> = (0..12)
        .map(|i| (format!("Family {i}"), format!("https://example/family-{i}.ttf")))
        .collect();
    let borrowed: Vec<(&str, &str)> = fonts.iter().map(|(f, u)| (f.as_str(), u.as_str())).collect();
    let fetcher = fetcher_with(&borrowed).with_latency(Duration::from_millis(30));
    let h = Harness::new(fetcher, MemoryStore::new(), false);
    assert_eq!(h.load().await, 12);
    assert_eq!(h.manager.gate().capacity(), 4);

    let results = join_all(fonts.iter().map(|(family, _)| h.manager.install(family))).await;
    for status in results {
        assert_eq!(status.unwrap(), InstallStatus::Installed);
    }

    assert!(h.fetcher.peak_in_flight() <= 4, "peak {}", h.fetcher.peak_in_flight());
    // Catalog request plus one download per font.
    assert_eq!(h.fetcher.request_count(), 13);
    assert_eq!(h.user_entries().len(), 12);
    assert_eq!(h.manager.gate().available(), 4);
}

#[tokio::test]
async fn ram_tier_is_filled_from_the_permanent_copy() {
    let fonts = [("Noto Sans", "https://example/noto.ttf")];
    let h = Harness::new(fetcher_with(&fonts), MemoryStore::new(), true);
    h.load().await;

    let permanent = h.config.permanent_dir();
    fs::create_dir_all(&permanent).unwrap();
    fs::write(permanent.join("Noto_Sans.ttf"), FONT_BYTES).unwrap();
    let requests = h.fetcher.request_count();

    assert_eq!(h.manager.install("Noto Sans").await.unwrap(), InstallStatus::Installed);
    assert_eq!(h.fetcher.request_count(), requests, "no binary download");
    assert_file(&h.config.ephemeral_dir.join("Noto_Sans.ttf"));
}

#[tokio::test]
async fn system_registered_fonts_cannot_be_uninstalled() {
    let fonts = [
        ("Arial", "https://example/arial.ttf"),
        ("Lato", "https://example/lato.ttf"),
    ];
    let root = std::env::temp_dir().join(format!("fontmgr_pipeline_{}", uuid::Uuid::new_v4()));
    let user_font = root.join("user-fonts").join("Lato.ttf");
    fs::create_dir_all(user_font.parent().unwrap()).unwrap();
    fs::write(&user_font, FONT_BYTES).unwrap();

    let store = MemoryStore::new()
        .with_entry(RegistrationScope::System, "Arial (TrueType)", "/usr/share/fonts/arial.ttf")
        .with_entry(RegistrationScope::User, "Lato (TrueType)", &user_font);
    let config = Config::rooted(root.join("data"), root.join("ram"));
    let h = Harness::with_config(root, config, fetcher_with(&fonts), store);
    h.load().await;

    let arial = h.manager.item("Arial").unwrap();
    assert_eq!(arial.status(), InstallStatus::Installed);
    assert!(!arial.can_uninstall());

    let lato = h.manager.item("Lato").unwrap();
    assert_eq!(lato.status(), InstallStatus::Installed);
    assert!(lato.can_uninstall());

    assert_eq!(h.manager.uninstall("Arial").await.unwrap(), InstallStatus::Installed);
    let system = h.registrar.store().entries(RegistrationScope::System).unwrap();
    assert_eq!(system.len(), 1);
    assert_eq!(h.registrar.loader().unloads(), 0);

    assert_eq!(h.manager.uninstall("Lato").await.unwrap(), InstallStatus::NotInstalled);
    assert!(!user_font.exists());
}

#[tokio::test]
async fn catalog_falls_back_to_the_stale_blob() {
    let fonts = [
        ("Roboto", "https://example/roboto.ttf"),
        ("Lato", "https://example/lato.ttf"),
    ];
    let h = Harness::new(fetcher_with(&fonts), MemoryStore::new(), false);
    assert_eq!(h.load().await, 2);
    assert_file(&h.config.cache_dir().join("fonts_cache.json"));

    h.fetcher.remove(CATALOG_URL);
    assert_eq!(h.load().await, 2);
    assert!(h.manager.item("Lato").is_some());
}

#[tokio::test]
async fn catalog_is_empty_without_network_or_blob() {
    let h = Harness::new(MemoryFetcher::new(), MemoryStore::new(), false);
    assert_eq!(h.load().await, 0);
    assert!(h.manager.items().is_empty());
}

#[tokio::test]
async fn failed_install_can_be_retried() {
    let fonts = [("Inter", "https://example/inter.ttf")];
    let fetcher = MemoryFetcher::new().with_resource(CATALOG_URL, catalog(&fonts));
    let h = Harness::new(fetcher, MemoryStore::new(), false);
    h.load().await;

    assert_eq!(h.manager.install("Inter").await.unwrap(), InstallStatus::Error);
    let item = h.manager.item("Inter").unwrap();
    assert_eq!(item.display_status(Locale::En), "Error");
    assert!(h.user_entries().is_empty());

    h.fetcher.insert("https://example/inter.ttf", FONT_BYTES);
    assert_eq!(h.manager.install("Inter").await.unwrap(), InstallStatus::Installed);
    assert_eq!(item.display_status(Locale::En), "Installed");
}

#[tokio::test]
async fn font_without_url_ends_in_error() {
    let fonts = [("Blank", "")];
    let h = Harness::new(fetcher_with(&[]), MemoryStore::new(), false);
    h.fetcher.insert(CATALOG_URL, catalog(&fonts));
    h.load().await;

    assert_eq!(h.manager.install("Blank").await.unwrap(), InstallStatus::Error);
    assert_eq!(h.fetcher.request_count(), 1, "only the catalog was requested");
}

#[tokio::test]
async fn install_publishes_status_and_preview_events() {
    let fonts = [("Noto Sans", "https://example/noto.ttf")];
    let h = Harness::new(fetcher_with(&fonts), MemoryStore::new(), false);
    let mut rx = h.manager.subscribe();
    h.load().await;

    h.manager.install("Noto Sans").await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let installed_path = h.user_dir().join("Noto_Sans.ttf");
    assert_eq!(
        events,
        vec![
            FontEvent::CatalogRefreshed { count: 1 },
            FontEvent::StatusChanged {
                family: "Noto Sans".to_owned(),
                status: InstallStatus::Downloading,
            },
            FontEvent::PreviewReady {
                family: "Noto Sans".to_owned(),
                path: installed_path,
            },
            FontEvent::StatusChanged {
                family: "Noto Sans".to_owned(),
                status: InstallStatus::Installed,
            },
        ]
    );
}

#[tokio::test]
async fn preview_and_install_share_one_download() {
    let fonts = [("Noto Sans", "https://example/noto.ttf")];
    let fetcher = fetcher_with(&fonts).with_latency(Duration::from_millis(30));
    let h = Harness::new(fetcher, MemoryStore::new(), false);
    h.load().await;
    let item = h.manager.item("Noto Sans").unwrap();
    let before = h.fetcher.request_count();

    let (preview, status) = tokio::join!(item.resolve_preview(), item.install());

    assert!(preview.is_some());
    assert_eq!(status, InstallStatus::Installed);
    assert_eq!(h.fetcher.request_count() - before, 1);
}

#[tokio::test]
async fn ensure_previews_downloads_each_font_once() {
    let fonts = [
        ("Roboto", "https://example/roboto.ttf"),
        ("Lato", "https://example/lato.ttf"),
        ("Missing", "https://example/missing.ttf"),
    ];
    let h = Harness::new(fetcher_with(&fonts[..2]), MemoryStore::new(), false);
    h.fetcher.insert(CATALOG_URL, catalog(&fonts));
    h.load().await;
    let before = h.fetcher.request_count();

    assert_eq!(h.manager.ensure_previews().await, 2);
    assert_eq!(h.manager.ensure_previews().await, 2);
    // Two hits and one miss on the first pass; only the miss is retried.
    assert_eq!(h.fetcher.request_count() - before, 4);

    let missing = h.manager.item("Missing").unwrap();
    assert!(missing.preview().is_none());
    assert_eq!(missing.status(), InstallStatus::NotInstalled);
}

#[tokio::test]
async fn favorites_are_persisted() {
    let fonts = [("Roboto", "https://example/roboto.ttf")];
    let h = Harness::new(fetcher_with(&fonts), MemoryStore::new(), false);
    h.load().await;

    assert!(h.manager.toggle_favorite("Roboto").unwrap());
    assert!(h.manager.item("Roboto").unwrap().is_favorite());

    let reopened = JsonFavoriteStore::open(h.config.favorites_path());
    assert_eq!(reopened.families(), vec!["Roboto".to_owned()]);

    assert!(!h.manager.toggle_favorite("Roboto").unwrap());
}

#[tokio::test]
async fn unknown_family_is_not_found() {
    let h = Harness::new(fetcher_with(&[]), MemoryStore::new(), false);
    h.fetcher.insert(CATALOG_URL, catalog(&[]));
    h.load().await;

    let err = h.manager.install("Nope").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(ref family) if family == "Nope"));
    assert!(h.manager.toggle_favorite("Nope").is_err());
}

#[tokio::test]
async fn uninstall_without_cached_copy_downloads_the_preview_again() {
    let fonts = [("Noto Sans", "https://example/noto.ttf")];
    let h = Harness::new(fetcher_with(&fonts), MemoryStore::new(), false);
    h.load().await;
    assert_eq!(h.manager.install("Noto Sans").await.unwrap(), InstallStatus::Installed);

    let cached = h.config.permanent_dir().join("Noto_Sans.ttf");
    fs::remove_file(&cached).unwrap();
    let before = h.fetcher.request_count();
    let mut rx = h.manager.subscribe();

    assert_eq!(h.manager.uninstall("Noto Sans").await.unwrap(), InstallStatus::NotInstalled);
    assert_eq!(h.fetcher.request_count() - before, 1);
    assert_file(&cached);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&FontEvent::PreviewReady {
        family: "Noto Sans".to_owned(),
        path: cached.clone(),
    }));
    assert_eq!(h.manager.item("Noto Sans").unwrap().preview().unwrap().path(), cached);
}

#[tokio::test]
async fn preview_downloads_never_exceed_the_gate() {
    let fonts: Vec<(String, String)> = (0..12)
        .map(|i| (format!("Preview {i}"), format!("https://example/preview-{i}.ttf")))
        .collect();
    let borrowed: Vec<(&str, &str)> = fonts.iter().map(|(f, u)| (f.as_str(), u.as_str())).collect();
    let fetcher = fetcher_with(&borrowed).with_latency(Duration::from_millis(30));
    let h = Harness::new(fetcher, MemoryStore::new(), false);
    assert_eq!(h.load().await, 12);

    assert_eq!(h.manager.ensure_previews().await, 12);
    assert!(h.fetcher.peak_in_flight() <= 4, "peak {}", h.fetcher.peak_in_flight());
    assert_eq!(h.fetcher.request_count(), 13);
    assert_eq!(h.manager.gate().available(), 4);
}

#[tokio::test]
async fn reload_keeps_an_install_in_flight() {
    let fonts = [("Noto Sans", "https://example/noto.ttf")];
    let fetcher = fetcher_with(&fonts).with_latency(Duration::from_millis(100));
    let h = Harness::new(fetcher, MemoryStore::new(), false);
    h.load().await;
    let original = h.manager.item("Noto Sans").unwrap();
    let record = original.record().clone();

    let (status, count) = tokio::join!(h.manager.install("Noto Sans"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(original.status(), InstallStatus::Downloading);
        h.manager.load_records(vec![record]).await
    });

    assert_eq!(status.unwrap(), InstallStatus::Installed);
    assert_eq!(count, 1);
    let current = h.manager.item("Noto Sans").unwrap();
    assert!(Arc::ptr_eq(&current, &original));
    assert_eq!(current.status(), InstallStatus::Installed);
}
