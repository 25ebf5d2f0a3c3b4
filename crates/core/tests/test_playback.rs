//! Playback integration tests: gapless scheduling, pacing, interruption
//! handling and lag telemetry driven through provider audio events.

mod fixtures;

use bytes::Bytes;
use fixtures::mock_provider::{engine_with, pump_events, MockConnector};
use tokio::time::{advance, Duration, Instant};
use voicebridge_core::{
    ChannelEvent, LagTrend, OutputCommand, SessionConfig, TrafficLight, TranslationMode,
};

fn config() -> SessionConfig {
    SessionConfig::new("german", TranslationMode::Simultaneous)
}

/// One second of PCM16 silence at the 24kHz output rate
fn one_sec_segment() -> Bytes {
    Bytes::from(vec![0u8; 24_000 * 2])
}

fn plays(commands: &[OutputCommand]) -> Vec<(Instant, f32)> {
    commands
        .iter()
        .filter_map(|c| match c {
            OutputCommand::Play { start, rate, .. } => Some((*start, *rate)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_reply_audio_schedules_playback() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    connector.emit(ChannelEvent::Audio(one_sec_segment()));
    pump_events(&mut engine, &mut events).await;

    let commands = engine.drain_output();
    let plays = plays(&commands);
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].1, 1.0);
    assert!(engine.ai_speaking());
    assert_eq!(engine.dashboard().traffic_light, TrafficLight::Talk);
}

#[tokio::test(start_paused = true)]
async fn test_segments_schedule_back_to_back() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    connector.emit(ChannelEvent::Audio(one_sec_segment()));
    connector.emit(ChannelEvent::Audio(one_sec_segment()));
    pump_events(&mut engine, &mut events).await;

    let commands = engine.drain_output();
    let plays = plays(&commands);
    assert_eq!(plays.len(), 2);
    // Second segment starts exactly where the first ends
    assert_eq!(plays[1].0 - plays[0].0, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_backlog_triggers_fast_playback() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    for _ in 0..18 {
        connector.emit(ChannelEvent::Audio(one_sec_segment()));
    }
    pump_events(&mut engine, &mut events).await;

    let commands = engine.drain_output();
    let plays = plays(&commands);
    assert_eq!(plays.len(), 18);
    assert_eq!(plays[0].1, 1.0);
    // Segments scheduled past the backlog threshold run fast
    assert!((plays[17].1 - 1.1).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_provider_interrupt_silences_queue() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    for _ in 0..3 {
        connector.emit(ChannelEvent::Audio(one_sec_segment()));
    }
    connector.emit(ChannelEvent::Interrupted);
    pump_events(&mut engine, &mut events).await;

    let commands = engine.drain_output();
    assert!(commands
        .iter()
        .any(|c| matches!(c, OutputCommand::StopAll)));
    assert_eq!(engine.dashboard().output_queue_secs, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_speech_end_debounce_clears_speaking() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    connector.emit(ChannelEvent::Audio(one_sec_segment()));
    pump_events(&mut engine, &mut events).await;
    assert!(engine.ai_speaking());

    // Segment retires, debounce arms
    advance(Duration::from_millis(1_050)).await;
    engine.on_tick().await;
    assert!(engine.ai_speaking());

    advance(Duration::from_millis(200)).await;
    engine.on_tick().await;
    assert!(!engine.ai_speaking());
    assert_eq!(engine.status(), "reply finished");
}

#[tokio::test(start_paused = true)]
async fn test_hard_stop_silences_immediately() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    connector.emit(ChannelEvent::Audio(one_sec_segment()));
    pump_events(&mut engine, &mut events).await;
    engine.drain_output();

    engine.stop(true).await;
    let commands = engine.drain_output();
    assert!(commands
        .iter()
        .any(|c| matches!(c, OutputCommand::StopAll)));
    assert!(!engine.ai_speaking());
}

#[tokio::test(start_paused = true)]
async fn test_total_lag_counts_output_queue() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    for _ in 0..5 {
        connector.emit(ChannelEvent::Audio(one_sec_segment()));
    }
    pump_events(&mut engine, &mut events).await;
    // Telemetry samples on the tick
    engine.on_tick().await;

    let lag = engine.total_lag();
    assert!(lag > 4.5 && lag <= 5.01, "lag was {lag}");
    assert!(engine.efficiency() < 60.0);
}

#[tokio::test(start_paused = true)]
async fn test_lag_trend_falls_as_queue_drains() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    for _ in 0..10 {
        connector.emit(ChannelEvent::Audio(one_sec_segment()));
    }
    pump_events(&mut engine, &mut events).await;

    // Queue drains one second per second with no new arrivals
    for _ in 0..6 {
        advance(Duration::from_secs(1)).await;
        engine.on_tick().await;
    }
    assert_eq!(engine.lag_trend(), LagTrend::Falling);
}

#[tokio::test(start_paused = true)]
async fn test_transcript_accumulates_both_roles() {
    let connector = MockConnector::new();
    let mut engine = engine_with(connector.clone());
    let mut events = engine.take_events().unwrap();
    engine.start(config()).await.unwrap();

    connector.emit(ChannelEvent::InputTranscript {
        text: "wie ".to_string(),
        is_final: false,
    });
    connector.emit(ChannelEvent::InputTranscript {
        text: "geht's".to_string(),
        is_final: true,
    });
    connector.emit(ChannelEvent::OutputTranscript {
        text: "how are you".to_string(),
        is_final: false,
    });
    connector.emit(ChannelEvent::TurnComplete);
    pump_events(&mut engine, &mut events).await;

    let items = engine.transcript();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text, "wie geht's");
    assert!(items[0].is_final);
    assert_eq!(items[1].text, "how are you");
    assert!(items[1].is_final);
}
