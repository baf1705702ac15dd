use fluxqc::prelude::*;

fn synthetic_ustar_rows(n: usize) -> Vec<UstarRow> {
    (0..n)
        .map(|i| {
            let ustar = 0.05 + (i as f64 % 50.0) * 0.02;
            let plateau = 0.5;
            let nee = if ustar < plateau {
                ustar * 10.0
            } else {
                plateau * 10.0 + (i as f64 % 3.0) * 0.01
            };
            UstarRow {
                timestamp: Timestamp::new(2021, (i % 12) as u8 + 1, 1, 1, 0, 0),
                nee,
                ta: (i as f64 % 30.0) - 10.0,
                ustar,
                swin: 0.0,
                ta_interpolated: false,
                swin_interpolated: false,
            }
        })
        .collect()
}

#[test]
fn ustar_pipeline_end_to_end() {
    let seasons = SeasonGroups::parse("12,1,2;3,4,5;6,7,8;9,10,11").unwrap();
    let rows = synthetic_ustar_rows(6000);
    let config = UstarConfig::default();

    let result = estimate_thresholds(&rows, &seasons, &config, Resolution::HalfHourly).unwrap();
    assert!(!result.thresholds.is_empty());
    assert!(result.thresholds.iter().all(|row| row.len() == 6));
}

#[test]
fn bootstrap_wraps_the_same_engine() {
    let seasons = SeasonGroups::parse("12,1,2;3,4,5;6,7,8;9,10,11").unwrap();
    let rows = synthetic_ustar_rows(6000);
    let config = BootstrapConfig {
        iterations: 10,
        ..BootstrapConfig::default()
    };

    let report = run_bootstrap(&rows, &seasons, &config, Resolution::HalfHourly).unwrap();
    assert_eq!(report.modes.len(), 6);
    assert!(report.modes.iter().all(|m| m.draws.len() == 10));
}

#[test]
fn mds_gap_fill_never_drops_a_row() {
    let mut rows = Vec::new();
    for i in 0..100 {
        let sw_in = 200.0 + (i as f64 % 10.0);
        let ta = 15.0 + (i as f64 % 5.0) * 0.1;
        let vpd = 1.0;
        let target = 4.0 + (i as f64 % 7.0) * 0.05;
        rows.push(MdsRow { target, sw_in, ta, vpd });
    }
    for missing in [10, 25, 50, 75] {
        rows[missing].target = INVALID;
    }

    let config = MdsConfig::default();
    let outcome = fill_gaps(&rows, &config, Resolution::HalfHourly);

    assert_eq!(outcome.results.len(), rows.len());
    for missing in [10, 25, 50, 75] {
        assert!(!outcome.results[missing].target_valid);
        assert!(outcome.results[missing].method.is_some());
    }
}

#[test]
fn calendar_round_trip_across_a_leap_year() {
    let cal = YearCalendar::new(2020, Resolution::HalfHourly);
    assert_eq!(cal.rows(), 17568);
    let end = cal.end_timestamp(cal.rows() - 1).unwrap();
    assert_eq!(end, Timestamp::new(2021, 1, 1, 0, 0, 0));
    assert_eq!(cal.row_of_end(&end).unwrap(), cal.rows() - 1);
}
