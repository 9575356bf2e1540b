use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use research_mock_backend::MockBackend;
use research_protocol::{parse_inbound, InboundEvent, OutboundMessage};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_backend() -> String {
    let backend = MockBackend::bind("127.0.0.1:0").await.expect("bind");
    let url = backend.base_url().expect("local addr");
    backend.spawn();
    url
}

#[tokio::test]
async fn session_path_gets_scripted_replies() {
    let base = spawn_backend().await;
    let (mut socket, _) = connect_async(format!("{base}/ws/abc"))
        .await
        .expect("handshake");

    let start = OutboundMessage::start_research("rust").to_json().expect("encode");
    socket.send(Message::Text(start.into())).await.expect("send");

    let reply = socket.next().await.expect("reply").expect("frame");
    let Message::Text(text) = reply else {
        panic!("expected text frame, got {reply:?}");
    };
    let event = parse_inbound(text.as_str()).expect("valid record");
    assert_eq!(event.event_type(), "clarify");

    socket
        .send(Message::Text("{\"type\":\"bogus\"}".into()))
        .await
        .expect("send");
    let reply = socket.next().await.expect("reply").expect("frame");
    let Message::Text(text) = reply else {
        panic!("expected text frame, got {reply:?}");
    };
    assert_eq!(
        parse_inbound(text.as_str()).expect("valid record"),
        InboundEvent::Error {
            message: parse_error_message(text.as_str()),
            trace_id: Some("abc".to_string()),
        }
    );
}

fn parse_error_message(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).expect("json");
    value["message"].as_str().map(str::to_string)
}

#[tokio::test]
async fn other_paths_are_refused() {
    let base = spawn_backend().await;
    assert!(connect_async(format!("{base}/socket")).await.is_err());
}

async fn next_record<S>(socket: &mut S) -> InboundEvent
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = socket.next().await.expect("stream open").expect("frame");
        if let Message::Text(text) = frame {
            return parse_inbound(text.as_str()).expect("valid record");
        }
    }
}

#[tokio::test]
async fn paced_run_lets_steering_land_before_the_report() {
    let backend = MockBackend::bind("127.0.0.1:0")
        .await
        .expect("bind")
        .with_pacing(Duration::from_millis(150));
    let base = backend.base_url().expect("local addr");
    backend.spawn();

    let (mut socket, _) = connect_async(format!("{base}/ws/paced"))
        .await
        .expect("handshake");
    for message in [
        OutboundMessage::start_research("rust"),
        OutboundMessage::clarify_answer("A"),
        OutboundMessage::steer("only 2024"),
    ] {
        let json = message.to_json().expect("encode");
        socket.send(Message::Text(json.into())).await.expect("send");
    }

    let mut kinds = Vec::new();
    while kinds.last().map(String::as_str) != Some("result") {
        kinds.push(next_record(&mut socket).await.event_type().to_string());
    }

    let ack = kinds.iter().position(|kind| kind == "steer_ack");
    assert!(ack.is_some_and(|ack| ack < kinds.len() - 1), "{kinds:?}");
    let run: Vec<&str> = kinds
        .iter()
        .map(String::as_str)
        .filter(|kind| *kind != "steer_ack")
        .collect();
    assert_eq!(run, vec!["clarify", "plan", "cot", "sources", "result"]);
}
