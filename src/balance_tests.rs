// src/balance_tests.rs

#[cfg(test)]
mod tests {
    use crate::balance::*;

    // Builds a well-formed 29-character movement line
    fn movement_line(
        company: &str,
        year: i32,
        month: u32,
        registration: &str,
        event_code: &str,
        value_minutes: i64,
    ) -> String {
        format!("{company:<4}{year:04}{month:02}{registration:<6}{event_code:<4}{value_minutes:09}")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn well_formed_line_round_trips() {
        let line = movement_line("0001", 2025, 3, "000123", "2805", 120);
        assert_eq!(line.chars().count(), MIN_LINE_WIDTH);

        let parsed = parse_movements(&line);
        assert!(parsed.warnings.is_empty());
        assert_eq!(
            parsed.events,
            vec![Event {
                company: "0001".to_string(),
                year: 2025,
                month: 3,
                registration: "000123".to_string(),
                event_code: "2805".to_string(),
                value_minutes: 120,
            }]
        );
    }

    #[test]
    fn crlf_and_blank_lines_are_handled() {
        let content = format!(
            "{}\r\n\r\n{}\r\n",
            movement_line("0001", 2025, 3, "000123", "2805", 120),
            movement_line("0001", 2025, 3, "000456", "2807", 60),
        );

        let parsed = parse_movements(&content);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.events[0].registration, "000123");
        assert_eq!(parsed.events[1].registration, "000456");
    }

    #[test]
    fn short_line_decodes_placeholders_and_continues() {
        let content = format!(
            "00012025\n{}",
            movement_line("0001", 2025, 3, "000123", "2805", 120)
        );

        let parsed = parse_movements(&content);
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::ShortLine {
                line: 1,
                got: 8,
                expected: MIN_LINE_WIDTH,
            }]
        );
        assert_eq!(parsed.events.len(), 2);

        let truncated = &parsed.events[0];
        assert_eq!(truncated.company, "0001");
        assert_eq!(truncated.year, 2025);
        assert_eq!(truncated.month, 0);
        assert_eq!(truncated.registration, "");
        assert_eq!(truncated.event_code, "");
        assert_eq!(truncated.value_minutes, 0);

        assert_eq!(parsed.events[1].registration, "000123");
    }

    #[test]
    fn non_numeric_value_column_is_reported() {
        let line = "00012025030001232805ABCDEFGHI";
        let parsed = parse_movements(line);

        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::NonNumericColumn {
                line: 1,
                column: "value",
                text: "ABCDEFGHI".to_string(),
            }]
        );
        assert_eq!(parsed.events[0].value_minutes, 0);
    }

    #[test]
    fn standard_table_bucket_membership() {
        let table = EventCodeTable::standard();
        assert_eq!(table.bucket_for("2805"), Some(BalanceBucket::Overtime100));
        assert_eq!(table.bucket_for("2806"), Some(BalanceBucket::Overtime50));
        assert_eq!(
            table.bucket_for("2807"),
            Some(BalanceBucket::UnjustifiedAbsence)
        );
        assert_eq!(
            table.bucket_for("2808"),
            Some(BalanceBucket::JustifiedAbsence)
        );
        assert_eq!(
            table.bucket_for("2809"),
            Some(BalanceBucket::MedicalCertificate)
        );
        assert_eq!(table.bucket_for("9999"), None);
    }

    #[test]
    fn range_2900_table_moves_overtime_codes() {
        let table = EventCodeTable::range_2900();
        assert_eq!(table.bucket_for("2901"), Some(BalanceBucket::Overtime100));
        assert_eq!(table.bucket_for("2902"), Some(BalanceBucket::Overtime50));
        assert_eq!(table.bucket_for("2805"), None);
        assert_eq!(
            table.bucket_for("2807"),
            Some(BalanceBucket::UnjustifiedAbsence)
        );
    }

    #[test]
    fn code_table_loads_from_json() {
        let table: EventCodeTable = serde_json::from_str(
            r#"{
                "overtime_100": ["0101", "0102"],
                "overtime_50": ["0103"],
                "unjustified_absence": ["0200"]
            }"#,
        )
        .expect("code table json");

        assert_eq!(table.bucket_for("0102"), Some(BalanceBucket::Overtime100));
        assert_eq!(
            table.bucket_for("0200"),
            Some(BalanceBucket::UnjustifiedAbsence)
        );
        // Sections left out of the JSON are empty, not defaulted to 2800s
        assert_eq!(table.bucket_for("2808"), None);
    }

    #[test]
    fn absence_is_paid_from_overtime_100_first() {
        let events = vec![
            Event {
                company: "0001".to_string(),
                year: 2025,
                month: 3,
                registration: "000123".to_string(),
                event_code: "2805".to_string(),
                value_minutes: 120,
            },
            Event {
                company: "0001".to_string(),
                year: 2025,
                month: 3,
                registration: "000123".to_string(),
                event_code: "2807".to_string(),
                value_minutes: 90,
            },
        ];

        let results = reconcile(&events, &EventCodeTable::standard());
        assert_eq!(results.len(), 1);

        let result = &results[0];
        assert_eq!(result.registration, "000123");
        // 2.0h of overtime 100% minus 1.5h of absence
        assert!(close(result.overtime_remaining_hours, 0.5));
        assert!(close(result.absence_remaining_hours, 0.0));
    }

    #[test]
    fn absence_spills_into_overtime_50() {
        let events = [
            ("2805", 60),
            ("2806", 120),
            ("2807", 150),
        ]
        .iter()
        .map(|(code, minutes)| Event {
            company: "0001".to_string(),
            year: 2025,
            month: 4,
            registration: "000777".to_string(),
            event_code: code.to_string(),
            value_minutes: *minutes,
        })
        .collect::<Vec<_>>();

        let results = reconcile(&events, &EventCodeTable::standard());
        let result = &results[0];

        // 2.5h of absence consumes 1.0h at 100% and 1.5h at 50%
        assert!(close(result.overtime_remaining_hours, 0.5));
        assert!(close(result.absence_remaining_hours, 0.0));
    }

    #[test]
    fn leftover_absence_becomes_a_deficit() {
        let events = [("2805", 60), ("2806", 60), ("2807", 300)]
            .iter()
            .map(|(code, minutes)| Event {
                company: "0001".to_string(),
                year: 2025,
                month: 5,
                registration: "000900".to_string(),
                event_code: code.to_string(),
                value_minutes: *minutes,
            })
            .collect::<Vec<_>>();

        let results = reconcile(&events, &EventCodeTable::standard());
        let result = &results[0];

        assert!(close(result.overtime_remaining_hours, 0.0));
        assert!(close(result.absence_remaining_hours, 3.0));
    }

    #[test]
    fn offsetting_conserves_hours() {
        let cases = [
            // (overtime100, overtime50, absence) in minutes
            (120, 60, 90),
            (60, 60, 300),
            (0, 0, 45),
            (240, 0, 0),
        ];
        for (ot100, ot50, absence) in cases {
            let events = [("2805", ot100), ("2806", ot50), ("2807", absence)]
                .iter()
                .filter(|(_, minutes)| *minutes > 0)
                .map(|(code, minutes)| Event {
                    company: "0001".to_string(),
                    year: 2025,
                    month: 6,
                    registration: "000100".to_string(),
                    event_code: code.to_string(),
                    value_minutes: *minutes,
                })
                .collect::<Vec<_>>();
            if events.is_empty() {
                continue;
            }

            let before_overtime = (ot100 + ot50) as f64 / 60.0;
            let before_absence = absence as f64 / 60.0;
            let result = &reconcile(&events, &EventCodeTable::standard())[0];

            let consumed = before_overtime - result.overtime_remaining_hours;
            let expected = before_absence.min(before_overtime);
            assert!(close(consumed, expected), "case {ot100}/{ot50}/{absence}");
            assert!(
                close(result.absence_remaining_hours, before_absence - expected),
                "case {ot100}/{ot50}/{absence}"
            );
        }
    }

    #[test]
    fn justified_and_medical_hours_pass_through() {
        let events = [("2807", 90), ("2808", 30), ("2809", 60)]
            .iter()
            .map(|(code, minutes)| Event {
                company: "0001".to_string(),
                year: 2025,
                month: 7,
                registration: "000200".to_string(),
                event_code: code.to_string(),
                value_minutes: *minutes,
            })
            .collect::<Vec<_>>();

        let result = &reconcile(&events, &EventCodeTable::standard())[0];

        assert!(close(result.justified_absence_hours, 0.5));
        assert!(close(result.medical_certificate_hours, 1.0));
        // No overtime to consume the unjustified absence
        assert!(close(result.absence_remaining_hours, 1.5));
    }

    #[test]
    fn unknown_codes_do_not_contribute() {
        let events = [("2805", 120), ("9999", 600)]
            .iter()
            .map(|(code, minutes)| Event {
                company: "0001".to_string(),
                year: 2025,
                month: 8,
                registration: "000300".to_string(),
                event_code: code.to_string(),
                value_minutes: *minutes,
            })
            .collect::<Vec<_>>();

        let result = &reconcile(&events, &EventCodeTable::standard())[0];
        assert!(close(result.overtime_remaining_hours, 2.0));
    }

    #[test]
    fn results_keep_registration_encounter_order() {
        let registrations = ["000456", "000123", "000456", "000789"];
        let events = registrations
            .iter()
            .map(|registration| Event {
                company: "0001".to_string(),
                year: 2025,
                month: 9,
                registration: registration.to_string(),
                event_code: "2805".to_string(),
                value_minutes: 60,
            })
            .collect::<Vec<_>>();

        let results = reconcile(&events, &EventCodeTable::standard());
        let order: Vec<&str> = results.iter().map(|r| r.registration.as_str()).collect();
        assert_eq!(order, vec!["000456", "000123", "000789"]);
        assert!(close(results[0].overtime_remaining_hours, 2.0));
    }

    #[test]
    fn parse_and_reconcile_end_to_end() {
        let content = format!(
            "{}\n{}\n{}",
            movement_line("0001", 2025, 3, "000123", "2805", 120),
            movement_line("0001", 2025, 3, "000123", "2807", 90),
            movement_line("0001", 2025, 3, "000456", "2806", 30),
        );

        let parsed = parse_movements(&content);
        assert!(parsed.warnings.is_empty());

        let results = reconcile(&parsed.events, &EventCodeTable::standard());
        assert_eq!(results.len(), 2);
        assert!(close(results[0].overtime_remaining_hours, 0.5));
        assert!(close(results[1].overtime_remaining_hours, 0.5));
    }
}
