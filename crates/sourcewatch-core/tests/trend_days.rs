mod common;

use chrono::{TimeZone, Utc};
use common::{seed, store};
use sourcewatch_core::storage::ResultStore;
use sourcewatch_core::trend::{aggregate_by_source, aggregate_overall};

#[test]
fn three_days_give_three_ordered_points() {
    let s = store();
    let q = seed(&s, "Q", "A");
    let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2025, 3, d, h, 30, 0).unwrap();

    s.insert_result_at(q.id, "Galileo", "r", 90.0, "e", day(12, 8)).unwrap();
    s.insert_result_at(q.id, "Galileo", "r", 50.0, "e", day(10, 23)).unwrap();
    s.insert_result_at(q.id, "Galileo", "r", 70.0, "e", day(10, 1)).unwrap();
    s.insert_result_at(q.id, "Galileo", "r", 40.0, "e", day(11, 12)).unwrap();
    s.insert_result_at(q.id, "Gradio", "r", 10.0, "e", day(20, 12)).unwrap();

    let trends = aggregate_by_source(&s.list_by_source("Galileo").unwrap());
    assert_eq!(trends.len(), 1);
    let points = &trends[0].points;
    let dates: Vec<String> = points.iter().map(|p| p.date.to_string()).collect();
    assert_eq!(dates, vec!["2025-03-10", "2025-03-11", "2025-03-12"]);
    assert_eq!(points[0].mean_score, 60.0);
    assert_eq!(points[0].count, 2);

    let all = s.list_all().unwrap();
    assert_eq!(aggregate_by_source(&all).len(), 2);
    // Overall skips the empty days between the 12th and the 20th.
    assert_eq!(aggregate_overall(&all).len(), 4);
}
