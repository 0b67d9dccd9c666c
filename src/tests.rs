#[cfg(test)]
mod tests {
    use crate::scale_core::{
        Cat, CatWeight, Classification, EventBuffer, FilterEvent, FilterEventHandler,
        ScaleEventClassifier,
    };
    use chrono::{DateTime, TimeZone, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_684_566_000 + secs, 0).unwrap()
    }

    /// A visit as the filter reports it: cat steps on, sits, leaves poo behind
    #[test]
    fn test_recorded_visit_becomes_measurement() {
        let roster = vec![Cat {
            id: 4,
            name: "Mogli".to_string(),
            weights: vec![CatWeight { timestamp: t(-3600), weight: 6100.0 }],
        }];
        let mut buffer = EventBuffer::new(1);

        buffer.start_of_event(t(0));
        buffer.stable_phase(t(8), 0.8, 2300.0);
        buffer.stable_phase(t(70), 55.0, 6180.0);
        buffer.stable_phase(t(95), 12.0, 37.5);
        buffer.end_of_event(t(110));

        let mut events = buffer.into_scale_events();
        assert_eq!(events.len(), 1);

        let classifier = ScaleEventClassifier::with_defaults();
        let result = classifier.classify_in_place(&roster, &mut events[0]);

        match result {
            Classification::Measurement(m) => {
                assert_eq!(m.cat_id, 4);
                assert_eq!(m.cat_weight, 6180.0);
                assert_eq!(m.poo_weight, 37.5);
                assert_eq!(m.setup_time, 15.0);
                assert_eq!(m.poo_time, 55.0);
                assert_eq!(m.cleanup_time, 40.0);
            }
            other => panic!("expected measurement, got {:?}", other),
        }
        assert!(events[0].measurement().is_some());
    }

    /// Litter scooped out in two passes, then the lid settles back
    #[test]
    fn test_recorded_cleaning_from_jsonl() {
        let lines = [
            r#"{"type":"start_of_event","timestamp":"2023-05-20T07:00:00Z"}"#,
            r#"{"type":"stable_phase","timestamp":"2023-05-20T07:00:20Z","length":6.0,"value":-1450.0}"#,
            r#"{"type":"stable_phase","timestamp":"2023-05-20T07:00:40Z","length":4.0,"value":-2100.0}"#,
            r#"{"type":"stable_phase","timestamp":"2023-05-20T07:01:10Z","length":15.0,"value":-320.0}"#,
            r#"{"type":"end_of_event","timestamp":"2023-05-20T07:01:30Z"}"#,
        ];
        let mut buffer = EventBuffer::new(1);
        for line in lines {
            FilterEvent::from_jsonl(line).unwrap().dispatch(&mut buffer);
        }

        let events = buffer.into_scale_events();
        let result = ScaleEventClassifier::with_defaults().classify(&[], &events[0]);

        match result {
            Classification::Cleaning(c) => {
                assert_eq!(c.weight, -320.0);
                assert_eq!(c.time, 90.0);
            }
            other => panic!("expected cleaning, got {:?}", other),
        }
    }
}
