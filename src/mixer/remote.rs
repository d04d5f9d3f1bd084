//! WebSocket implementation of the mixer client.
//!
//! The socket is owned by a dedicated I/O thread. Calls from the control
//! thread go through a command channel and block on a per-call reply
//! channel; the I/O thread matches responses to callers by request id and
//! forwards pushed events on the event channel.

use crossbeam_channel as channel;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    io,
    net::TcpStream,
    sync::atomic::{AtomicU64, Ordering},
    thread,
    time::Duration,
};
use tungstenite::{stream::MaybeTlsStream, Message, WebSocket};

use super::{
    event::{MeterReading, MixerEvent},
    Error, MixerClient, MonitorType, SourceId, SourceInfo,
};

mod op {
    pub const HELLO: u64 = 0;
    pub const IDENTIFY: u64 = 1;
    pub const IDENTIFIED: u64 = 2;
    pub const EVENT: u64 = 5;
    pub const REQUEST: u64 = 6;
    pub const REQUEST_RESPONSE: u64 = 7;
}

const RPC_VERSION: u64 = 1;

// Input state changes (1 << 3) and the high-volume meter feed (1 << 16).
const EVENT_SUBSCRIPTIONS: u64 = (1 << 3) | (1 << 16);

// The record/solo button mirrors membership of this audio track.
const RECORD_TRACK: &str = "2";

// How long a socket read may block before outbound commands are drained.
const SOCKET_POLL: Duration = Duration::from_millis(10);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

struct Request {
    id: u64,
    request_type: &'static str,
    data: Value,
}

enum Command {
    Call {
        request: Request,
        resp_tx: channel::Sender<Result<Value, Error>>,
    },
    Submit {
        request: Request,
    },
}

pub struct RemoteMixer {
    cmd_tx: channel::Sender<Command>,
    next_id: AtomicU64,
}

impl RemoteMixer {
    /// Connects, runs the identification handshake and spawns the socket
    /// thread. Pushed events arrive on the returned channel; the channel
    /// closes when the connection is lost.
    pub fn connect(
        url: &str,
        password: Option<&str>,
    ) -> Result<(Self, channel::Receiver<MixerEvent>), Error> {
        let (mut socket, _) = tungstenite::connect(url)?;
        identify(&mut socket, password)?;

        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream
                .set_read_timeout(Some(SOCKET_POLL))
                .map_err(tungstenite::Error::from)?;
        }

        let (cmd_tx, cmd_rx) = channel::unbounded();
        let (evt_tx, evt_rx) = channel::unbounded();

        thread::spawn(move || run_socket(socket, cmd_rx, evt_tx));

        Ok((
            Self {
                cmd_tx,
                next_id: AtomicU64::new(1),
            },
            evt_rx,
        ))
    }

    fn request(&self, request_type: &'static str, data: Value) -> Request {
        Request {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            request_type,
            data,
        }
    }

    fn call(&self, request_type: &'static str, data: Value) -> Result<Value, Error> {
        let (resp_tx, resp_rx) = channel::bounded(1);

        self.cmd_tx
            .send(Command::Call {
                request: self.request(request_type, data),
                resp_tx,
            })
            .map_err(|_| Error::Disconnected)?;

        resp_rx.recv().map_err(|_| Error::Disconnected)?
    }

    fn call_as<T: serde::de::DeserializeOwned>(
        &self,
        request_type: &'static str,
        data: Value,
    ) -> Result<T, Error> {
        Ok(serde_json::from_value(self.call(request_type, data)?)?)
    }

    fn submit(&self, request_type: &'static str, data: Value) {
        let _ = self.cmd_tx.send(Command::Submit {
            request: self.request(request_type, data),
        });
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputList {
    inputs: Vec<InputItem>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputItem {
    input_name: String,
    input_uuid: String,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitorTypeResponse {
    monitor_type: MonitorType,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct MuteResponse {
    input_muted: bool,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    input_audio_balance: f64,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeResponse {
    input_volume_mul: f64,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracksResponse {
    input_audio_tracks: HashMap<String, bool>,
}

impl MixerClient for RemoteMixer {
    fn list_sources(&self) -> Result<Vec<SourceInfo>, Error> {
        let list: InputList = self.call_as("GetInputList", json!({}))?;

        Ok(list
            .inputs
            .into_iter()
            .map(|input| SourceInfo {
                name: input.input_name.as_str().into(),
                id: SourceId::from(input.input_uuid.as_str()),
            })
            .collect())
    }

    fn monitor_type(&self, id: &SourceId) -> Result<MonitorType, Error> {
        let resp: MonitorTypeResponse = self.call_as(
            "GetInputAudioMonitorType",
            json!({ "inputUuid": id.as_str() }),
        )?;

        Ok(resp.monitor_type)
    }

    fn set_monitor_type(&self, id: &SourceId, monitor: MonitorType) -> Result<(), Error> {
        self.call(
            "SetInputAudioMonitorType",
            json!({ "inputUuid": id.as_str(), "monitorType": monitor }),
        )?;

        Ok(())
    }

    fn muted(&self, id: &SourceId) -> Result<bool, Error> {
        let resp: MuteResponse =
            self.call_as("GetInputMute", json!({ "inputUuid": id.as_str() }))?;

        Ok(resp.input_muted)
    }

    fn set_muted(&self, id: &SourceId, muted: bool) -> Result<(), Error> {
        self.call(
            "SetInputMute",
            json!({ "inputUuid": id.as_str(), "inputMuted": muted }),
        )?;

        Ok(())
    }

    fn balance(&self, id: &SourceId) -> Result<f64, Error> {
        let resp: BalanceResponse =
            self.call_as("GetInputAudioBalance", json!({ "inputUuid": id.as_str() }))?;

        Ok(resp.input_audio_balance)
    }

    fn set_balance(&self, id: &SourceId, balance: f64) -> Result<(), Error> {
        self.call(
            "SetInputAudioBalance",
            json!({ "inputUuid": id.as_str(), "inputAudioBalance": balance }),
        )?;

        Ok(())
    }

    fn volume(&self, id: &SourceId) -> Result<f64, Error> {
        let resp: VolumeResponse =
            self.call_as("GetInputVolume", json!({ "inputUuid": id.as_str() }))?;

        Ok(resp.input_volume_mul)
    }

    fn set_volume(&self, id: &SourceId, mul: f64) -> Result<(), Error> {
        self.call(
            "SetInputVolume",
            json!({ "inputUuid": id.as_str(), "inputVolumeMul": mul }),
        )?;

        Ok(())
    }

    fn submit_volume(&self, id: &SourceId, mul: f64) {
        self.submit(
            "SetInputVolume",
            json!({ "inputUuid": id.as_str(), "inputVolumeMul": mul }),
        );
    }

    fn record_track(&self, id: &SourceId) -> Result<bool, Error> {
        let resp: TracksResponse =
            self.call_as("GetInputAudioTracks", json!({ "inputUuid": id.as_str() }))?;

        Ok(resp
            .input_audio_tracks
            .get(RECORD_TRACK)
            .copied()
            .unwrap_or(false))
    }

    fn set_record_track(&self, id: &SourceId, enabled: bool) -> Result<(), Error> {
        self.call(
            "SetInputAudioTracks",
            json!({
                "inputUuid": id.as_str(),
                "inputAudioTracks": { RECORD_TRACK: enabled },
            }),
        )?;

        Ok(())
    }
}

fn identify(socket: &mut Socket, password: Option<&str>) -> Result<(), Error> {
    let hello = read_json(socket)?;
    if hello["op"].as_u64() != Some(op::HELLO) {
        return Err(Error::Handshake(format!(
            "expected Hello, got op {}",
            hello["op"]
        )));
    }

    let mut identify = json!({
        "op": op::IDENTIFY,
        "d": {
            "rpcVersion": RPC_VERSION,
            "eventSubscriptions": EVENT_SUBSCRIPTIONS,
        },
    });

    if let Some(auth) = hello["d"].get("authentication") {
        let password = password.ok_or(Error::PasswordRequired)?;
        let (salt, challenge) = auth["salt"]
            .as_str()
            .zip(auth["challenge"].as_str())
            .ok_or_else(|| Error::Handshake("malformed authentication challenge".into()))?;

        identify["d"]["authentication"] = authentication_string(password, salt, challenge).into();
    }

    socket.send(Message::Text(identify.to_string()))?;

    let identified = read_json(socket)?;
    if identified["op"].as_u64() != Some(op::IDENTIFIED) {
        return Err(Error::Handshake(format!(
            "expected Identified, got op {}",
            identified["op"]
        )));
    }

    log::info!(
        "Mixer identified, rpc version {}",
        identified["d"]["negotiatedRpcVersion"]
    );

    Ok(())
}

fn read_json(socket: &mut Socket) -> Result<Value, Error> {
    loop {
        match socket.read()? {
            Message::Text(txt) => return Ok(serde_json::from_str(&txt)?),
            Message::Close(_) => return Err(Error::Disconnected),
            _ => (),
        }
    }
}

fn authentication_string(password: &str, salt: &str, challenge: &str) -> String {
    use base64::engine::{general_purpose::STANDARD, Engine};
    use sha2::{Digest, Sha256};

    let secret = STANDARD.encode(Sha256::digest(format!("{password}{salt}")));

    STANDARD.encode(Sha256::digest(format!("{secret}{challenge}")))
}

fn run_socket(
    mut socket: Socket,
    cmd_rx: channel::Receiver<Command>,
    evt_tx: channel::Sender<MixerEvent>,
) {
    let mut pending: HashMap<u64, channel::Sender<Result<Value, Error>>> = HashMap::new();

    loop {
        loop {
            match cmd_rx.try_recv() {
                Ok(Command::Call { request, resp_tx }) => {
                    match send_request(&mut socket, &request) {
                        Ok(()) => {
                            pending.insert(request.id, resp_tx);
                        }
                        Err(err) => {
                            let _ = resp_tx.send(Err(err));
                        }
                    }
                }
                Ok(Command::Submit { request }) => {
                    if let Err(err) = send_request(&mut socket, &request) {
                        log::warn!("Dropped {} submission: {err}", request.request_type);
                    }
                }
                Err(channel::TryRecvError::Empty) => break,
                Err(channel::TryRecvError::Disconnected) => return,
            }
        }

        match socket.read() {
            Ok(Message::Text(txt)) => handle_frame(&txt, &mut pending, &evt_tx),
            Ok(_) => (),
            Err(tungstenite::Error::Io(err)) if is_poll_timeout(&err) => (),
            Err(err) => {
                log::error!("Mixer socket closed: {err}");
                for (_, resp_tx) in pending.drain() {
                    let _ = resp_tx.send(Err(Error::Disconnected));
                }
                return;
            }
        }
    }
}

fn is_poll_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn send_request(socket: &mut Socket, request: &Request) -> Result<(), Error> {
    let frame = json!({
        "op": op::REQUEST,
        "d": {
            "requestType": request.request_type,
            "requestId": request.id.to_string(),
            "requestData": request.data,
        },
    });

    socket.send(Message::Text(frame.to_string()))?;

    Ok(())
}

fn handle_frame(
    txt: &str,
    pending: &mut HashMap<u64, channel::Sender<Result<Value, Error>>>,
    evt_tx: &channel::Sender<MixerEvent>,
) {
    let frame: Value = match serde_json::from_str(txt) {
        Ok(frame) => frame,
        Err(err) => {
            log::warn!("Undecodable mixer frame: {err}");
            return;
        }
    };

    match frame["op"].as_u64() {
        Some(op::EVENT) => {
            let d = &frame["d"];
            if let Some(event) = translate_event(
                d["eventType"].as_str().unwrap_or_default(),
                &d["eventData"],
            ) {
                let _ = evt_tx.send(event);
            }
        }
        Some(op::REQUEST_RESPONSE) => {
            let d = &frame["d"];
            let Some(id) = d["requestId"].as_str().and_then(|id| id.parse().ok()) else {
                return;
            };
            let Some(resp_tx) = pending.remove(&id) else {
                return;
            };

            let status = &d["requestStatus"];
            let result = if status["result"].as_bool().unwrap_or(false) {
                Ok(d["responseData"].clone())
            } else {
                Err(Error::Request {
                    request: d["requestType"].as_str().unwrap_or("unknown").to_owned(),
                    comment: status["comment"].as_str().unwrap_or_default().to_owned(),
                })
            };

            let _ = resp_tx.send(result);
        }
        _ => (),
    }
}

fn translate_event(event_type: &str, data: &Value) -> Option<MixerEvent> {
    let source = || data["inputUuid"].as_str().map(SourceId::from);

    match event_type {
        "InputVolumeChanged" => Some(MixerEvent::Volume {
            source: source()?,
            mul: data["inputVolumeMul"].as_f64()?,
        }),
        "InputMuteStateChanged" => Some(MixerEvent::Mute {
            source: source()?,
            muted: data["inputMuted"].as_bool()?,
        }),
        "InputAudioBalanceChanged" => Some(MixerEvent::Balance {
            source: source()?,
            balance: data["inputAudioBalance"].as_f64()?,
        }),
        "InputAudioTracksChanged" => Some(MixerEvent::RecordTrack {
            source: source()?,
            enabled: data["inputAudioTracks"][RECORD_TRACK].as_bool()?,
        }),
        "InputAudioMonitorTypeChanged" => Some(MixerEvent::Monitor {
            source: source()?,
            monitor: serde_json::from_value(data["monitorType"].clone()).ok()?,
        }),
        "InputVolumeMeters" => {
            let readings = data["inputs"]
                .as_array()?
                .iter()
                .filter_map(|input| {
                    let source = SourceId::from(input["inputUuid"].as_str()?);
                    let levels = input["inputLevelsMul"]
                        .as_array()?
                        .iter()
                        .filter_map(|chan| chan.get(1).and_then(Value::as_f64))
                        .collect();

                    Some(MeterReading { source, levels })
                })
                .collect();

            Some(MixerEvent::Meters(readings))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_string_shape() {
        let auth = authentication_string("secret", "c2FsdA==", "Y2hhbGxlbmdl");

        // base64 of a sha256 digest: 44 chars, padded.
        assert_eq!(auth.len(), 44);
        assert!(auth.ends_with('='));
        assert_eq!(
            auth,
            authentication_string("secret", "c2FsdA==", "Y2hhbGxlbmdl"),
        );
        assert_ne!(
            auth,
            authentication_string("other", "c2FsdA==", "Y2hhbGxlbmdl"),
        );
    }

    #[test]
    fn translate_volume_event() {
        let data = json!({ "inputUuid": "uuid-1", "inputVolumeMul": 0.5 });

        match translate_event("InputVolumeChanged", &data) {
            Some(MixerEvent::Volume { source, mul }) => {
                assert_eq!(source.as_str(), "uuid-1");
                assert!((mul - 0.5).abs() < f64::EPSILON);
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn translate_track_event_requires_record_track() {
        let data = json!({ "inputUuid": "uuid-1", "inputAudioTracks": { "1": true } });
        assert!(translate_event("InputAudioTracksChanged", &data).is_none());

        let data = json!({ "inputUuid": "uuid-1", "inputAudioTracks": { "2": true } });
        assert!(matches!(
            translate_event("InputAudioTracksChanged", &data),
            Some(MixerEvent::RecordTrack { enabled: true, .. }),
        ));
    }

    #[test]
    fn translate_meter_event() {
        let data = json!({
            "inputs": [
                {
                    "inputUuid": "uuid-1",
                    "inputLevelsMul": [[0.0, 0.25, 0.5], [0.0, 0.75, 0.5]],
                },
                { "inputUuid": "uuid-2", "inputLevelsMul": [] },
            ],
        });

        match translate_event("InputVolumeMeters", &data) {
            Some(MixerEvent::Meters(readings)) => {
                assert_eq!(readings.len(), 2);
                assert_eq!(readings[0].levels, vec![0.25, 0.75]);
                assert!(readings[1].levels.is_empty());
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn monitor_type_wire_names() {
        let monitor: MonitorType =
            serde_json::from_value(json!("OBS_MONITORING_TYPE_MONITOR_AND_OUTPUT")).unwrap();
        assert_eq!(monitor, MonitorType::MonitorAndOutput);
        assert!(monitor.is_monitoring());

        assert_eq!(
            serde_json::to_value(MonitorType::None).unwrap(),
            json!("OBS_MONITORING_TYPE_NONE"),
        );
    }
}
