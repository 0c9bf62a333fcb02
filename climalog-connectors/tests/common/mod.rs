//! Shared fixtures for the connector integration tests

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use climalog_core::{
    derive, FixedClock, RawSample, Record, RecordBuilder, RecordConfig, ValidatedSample,
};

/// 2024-01-01T00:00:00Z
pub const NEW_YEAR_2024: i64 = 1_704_067_200;

/// The worked example: 25 C and 50 % at the start of 2024, location "office"
pub fn office_record() -> Record {
    let sample = ValidatedSample::validate(RawSample {
        temperature_c: 25.0,
        humidity_pct: 50.0,
        pressure_hpa: None,
        acceleration: None,
    })
    .expect("fixture sample is valid");
    RecordBuilder::new(FixedClock::from_unix(NEW_YEAR_2024)).build(
        &sample,
        &derive(&sample),
        &RecordConfig::new("environment", "office"),
    )
}

/// One HTTP request as seen by [`HttpResponder`]
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Loopback HTTP server answering every request with a fixed status
pub struct HttpResponder {
    pub port: u16,
    requests: Receiver<CapturedRequest>,
}

impl HttpResponder {
    pub fn start(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        let (tx, requests) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                match serve(stream, status) {
                    Some(request) => {
                        if tx.send(request).is_err() {
                            break;
                        }
                    }
                    None => continue,
                }
            }
        });

        Self { port, requests }
    }

    /// Wait for the next captured request
    pub fn next_request(&self) -> CapturedRequest {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("request within 5s")
    }
}

fn serve(stream: TcpStream, status: u16) -> Option<CapturedRequest> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    let mut stream = stream;
    let reason = if status < 300 { "OK" } else { "Error" };
    let _ = write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status, reason
    );
    let _ = stream.flush();

    Some(CapturedRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Server that accepts connections and never answers
pub fn silent_server() -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let port = listener.local_addr().expect("local addr").port();
    let handle = thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().take(4) {
            if let Ok(stream) = stream {
                held.push(stream);
            }
        }
        thread::sleep(Duration::from_secs(2));
    });
    (port, handle)
}

/// A port nothing listens on
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    listener.local_addr().expect("local addr").port()
}

/// One PUBLISH received by [`FakeBroker`]
#[derive(Debug, Clone)]
pub struct ReceivedPublish {
    pub topic: String,
    pub qos: u8,
    pub payload: Vec<u8>,
}

/// Loopback MQTT 3.1.1 broker answering every CONNECT with a fixed return code
///
/// Return code 0 accepts the session; anything else refuses it and closes
/// the socket.
pub struct FakeBroker {
    pub port: u16,
    publishes: Receiver<ReceivedPublish>,
}

impl FakeBroker {
    pub fn start(return_code: u8) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        let (tx, publishes) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let tx = tx.clone();
                thread::spawn(move || {
                    let _ = broker_session(stream, return_code, &tx);
                });
            }
        });

        Self { port, publishes }
    }

    /// Wait for the next PUBLISH the broker received
    pub fn next_publish(&self) -> ReceivedPublish {
        self.publishes
            .recv_timeout(Duration::from_secs(5))
            .expect("publish within 5s")
    }
}

fn broker_session(
    mut stream: TcpStream,
    return_code: u8,
    tx: &mpsc::Sender<ReceivedPublish>,
) -> std::io::Result<()> {
    let (header, _) = read_packet(&mut stream)?;
    if header >> 4 != 1 {
        return Ok(());
    }
    // CONNACK: no session present, return code
    stream.write_all(&[0x20, 0x02, 0x00, return_code])?;
    if return_code != 0 {
        return Ok(());
    }

    loop {
        let (header, body) = read_packet(&mut stream)?;
        match header >> 4 {
            // PUBLISH
            3 => {
                let qos = (header >> 1) & 0x03;
                let topic_len = usize::from(u16::from_be_bytes([body[0], body[1]]));
                let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).into_owned();
                let mut at = 2 + topic_len;
                if qos > 0 {
                    // PUBACK echoes the packet id
                    stream.write_all(&[0x40, 0x02, body[at], body[at + 1]])?;
                    at += 2;
                }
                let publish = ReceivedPublish {
                    topic,
                    qos,
                    payload: body[at..].to_vec(),
                };
                if tx.send(publish).is_err() {
                    return Ok(());
                }
            }
            // PINGREQ
            12 => stream.write_all(&[0xD0, 0x00])?,
            // DISCONNECT
            14 => return Ok(()),
            _ => {}
        }
    }
}

fn read_packet(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
    let mut byte = [0u8; 1];
    stream.read_exact(&mut byte)?;
    let header = byte[0];

    let mut length = 0usize;
    let mut shift = 0;
    loop {
        stream.read_exact(&mut byte)?;
        length |= usize::from(byte[0] & 0x7F) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let mut body = vec![0u8; length];
    stream.read_exact(&mut body)?;
    Ok((header, body))
}
