//! Throughput of the NDJSON codec on the hot path: decoding an assistant
//! message and encoding an outbound user frame.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use open_agent_protocol::Message;

const ASSISTANT_LINE: &str = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"The capital of France is Paris."}],"model":"claude-sonnet"},"session_id":"sess-1"}"#;

fn decode_assistant_message(c: &mut Criterion) {
    c.bench_function("decode assistant message", |b| {
        b.iter(|| {
            let message: Message = serde_json::from_str(black_box(ASSISTANT_LINE)).unwrap();
            black_box(message);
        });
    });
}

fn encode_user_frame(c: &mut Criterion) {
    c.bench_function("encode user frame", |b| {
        b.iter(|| {
            let value = serde_json::json!({
                "type": "user",
                "message": {"role": "user", "content": black_box("hello")},
            });
            black_box(serde_json::to_string(&value).unwrap());
        });
    });
}

criterion_group!(benches, decode_assistant_message, encode_user_frame);
criterion_main!(benches);
