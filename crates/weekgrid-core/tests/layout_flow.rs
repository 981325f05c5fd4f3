use std::ffi::OsString;
use std::fs;

use chrono::NaiveDate;
use tempfile::tempdir;
use weekgrid_core::entry::{blocked_at, filter_by_resource, load_entries};
use weekgrid_core::{LayoutEngine, ScheduleConfig, SkipReason, UnplaceableReason, WeekWindow};

const CONFIG: &str = r#"
working_days = ["Segunda-Feira", "Terça-Feira", "Quarta-Feira", "Quinta-Feira", "Sexta-Feira"]
start_time = "08:00"
end_time = "18:00"
block_interval = 30
timezone = "America/Sao_Paulo"
"#;

const ENTRIES: &str = r#"[
  {"id": "A", "date": "2026-10-19", "startTime": "09:00:00", "endTime": "09:30:00", "isBlocked": false, "resourceId": "dr-ana"},
  {"id": "B", "date": "2026-10-19", "startTime": "09:00", "endTime": "09:45", "isBlocked": false, "resourceId": "dr-bruno"},
  {"id": "LUNCH", "date": "2026-10-20", "startTime": "12:00", "endTime": "13:00", "isBlocked": true, "resourceId": "dr-ana"},
  {"id": "DAY-OFF", "date": "2026-10-23", "startTime": "08:00", "endTime": "18:00", "isBlocked": true, "resourceId": "dr-bruno"},
  {"id": "NEXT", "date": "2026-10-26", "startTime": "09:00", "endTime": "09:30", "resourceId": "dr-ana"},
  {"id": "BROKEN", "date": "2026-10-21", "resourceId": "dr-ana"}
]"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 21).expect("date")
}

#[test]
fn clinic_week_from_files() {
    let temp = tempdir().expect("tempdir");
    let config_path = temp.path().join("weekgrid.toml");
    let entries_path = temp.path().join("entries.json");
    fs::write(&config_path, CONFIG).expect("write config");
    fs::write(&entries_path, ENTRIES).expect("write entries");

    let cfg = ScheduleConfig::load(Some(&config_path)).expect("load config");
    cfg.validate().expect("valid config");
    let grid = cfg.time_grid().expect("grid");
    let window = WeekWindow::resolve(today(), cfg.first_weekday(), 0, cfg.working_days.len())
        .expect("window");
    let entries = load_entries(&entries_path).expect("load entries");

    let layout = LayoutEngine::new(&grid, &window, &cfg.metrics).compute(&entries);

    let a = layout.placement("A").expect("A");
    let b = layout.placement("B").expect("B");
    assert_eq!((a.width_percent, a.offset_percent), (50.0, 0.0));
    assert_eq!((b.width_percent, b.offset_percent), (50.0, 50.0));

    let day_off = layout.placement("DAY-OFF").expect("day off");
    assert_eq!(day_off.day_index, 4);
    assert_eq!(day_off.top, 0.0);
    assert_eq!(day_off.height, 20.0 * 40.0 + 40.0);

    assert_eq!(layout.skip_reason("NEXT"), Some(SkipReason::OutOfWindow));
    assert_eq!(
        layout.skip_reason("BROKEN"),
        Some(SkipReason::Unplaceable {
            cause: UnplaceableReason::DegenerateTimes
        })
    );

    let tiers: Vec<bool> = layout.placements.iter().map(|p| p.is_blocked).collect();
    assert_eq!(tiers, vec![true, true, false, false]);

    let blocked = blocked_at(&entries, today() - chrono::Duration::days(1), 750, Some("dr-ana"));
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].id, "LUNCH");
}

#[test]
fn resource_filter_and_week_navigation() {
    let cfg = ScheduleConfig::from_toml_str(CONFIG).expect("config");
    let grid = cfg.time_grid().expect("grid");
    let entries = weekgrid_core::entry::parse_entries(ENTRIES).expect("entries");
    let only_ana = filter_by_resource(entries, &["dr-ana".to_string()]);

    let this_week = WeekWindow::resolve(today(), cfg.first_weekday(), 0, 5).expect("window");
    let layout = LayoutEngine::new(&grid, &this_week, &cfg.metrics).compute(&only_ana);
    let a = layout.placement("A").expect("A");
    assert_eq!(a.width_percent, 100.0);
    assert!(layout.placement("B").is_none());

    let next_week = WeekWindow::resolve(today(), cfg.first_weekday(), 1, 5).expect("window");
    let layout = LayoutEngine::new(&grid, &next_week, &cfg.metrics).compute(&only_ana);
    assert_eq!(layout.placement("NEXT").map(|p| p.day_index), Some(0));
    assert_eq!(layout.skip_reason("A"), Some(SkipReason::OutOfWindow));
}

#[test]
fn run_renders_json_for_a_fixed_day() {
    let temp = tempdir().expect("tempdir");
    let config_path = temp.path().join("weekgrid.toml");
    let entries_path = temp.path().join("entries.json");
    fs::write(&config_path, CONFIG).expect("write config");
    fs::write(&entries_path, ENTRIES).expect("write entries");

    let args: Vec<OsString> = vec![
        "weekgrid".into(),
        "-q".into(),
        "--config".into(),
        config_path.into_os_string(),
        "--today".into(),
        "2026-10-21".into(),
        "--set".into(),
        "block_interval=15".into(),
        "--format".into(),
        "json".into(),
        entries_path.into_os_string(),
    ];
    weekgrid_core::run(args).expect("run");
}

#[test]
fn run_reports_missing_entries_file() {
    let temp = tempdir().expect("tempdir");
    let config_path = temp.path().join("weekgrid.toml");
    fs::write(&config_path, CONFIG).expect("write config");

    let args: Vec<OsString> = vec![
        "weekgrid".into(),
        "-q".into(),
        "--config".into(),
        config_path.into_os_string(),
        "--today".into(),
        "2026-10-21".into(),
        temp.path().join("absent.json").into_os_string(),
    ];
    let err = weekgrid_core::run(args).expect_err("missing file");
    assert!(format!("{err:#}").contains("failed to load entries"));
}

#[test]
fn loosely_typed_records_degrade_one_entry_each() {
    let cfg = ScheduleConfig::from_toml_str(CONFIG).expect("config");
    let grid = cfg.time_grid().expect("grid");
    let window = WeekWindow::resolve(today(), cfg.first_weekday(), 0, 5).expect("window");
    let entries = weekgrid_core::entry::parse_entries(
        r#"[
          {"id": "ok", "date": "2026-10-19", "startTime": "09:00", "endTime": "09:30"},
          {"id": "numeric", "date": "2026-10-20", "startTime": 930, "endTime": "10:00"},
          {"id": "undated", "startTime": "09:00", "endTime": "09:30"}
        ]"#,
    )
    .expect("entries");

    let layout = LayoutEngine::new(&grid, &window, &cfg.metrics).compute(&entries);

    let ok = layout.placement("ok").expect("ok");
    assert!(ok.warnings.is_empty());

    let numeric = layout.placement("numeric").expect("numeric");
    assert_eq!(numeric.start_minutes, 0);
    assert_eq!(numeric.warnings.len(), 1);
    assert_eq!(numeric.warnings[0].raw.as_deref(), Some("930"));

    assert_eq!(
        layout.skip_reason("undated"),
        Some(SkipReason::Unplaceable {
            cause: UnplaceableReason::InvalidDate
        })
    );
}
