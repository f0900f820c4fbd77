use {
    crate::{
        codec::{ArgValue, EncodedMessage, FdQueue, RawMessage, decode_args, encode},
        dispatch::{
            DispatchError, Dispatcher, HostRole, INVALID_METHOD, INVALID_OBJECT, NextAction,
            Objects, Request, RequestHandler, Resource, Session,
        },
        object::{DISPLAY_ID, ObjectId},
        relay::{
            Connection, ConnectionHandle, EventError, Inbound, Peer, PeerError, RelayMessage,
            event_channel,
        },
        schema::Interface,
        test_utils::{eventfd, fd_arg, interface},
    },
    futures_util::future::{self, BoxFuture},
    std::{sync::Arc, time::Duration},
    tokio::sync::{Semaphore, mpsc},
};

const KINDS_ID: ObjectId = ObjectId::from_raw(7);

struct Recorder {
    objects: Objects,
    handled: mpsc::UnboundedSender<String>,
}

impl Session for Recorder {
    fn objects(&self) -> &Objects {
        &self.objects
    }

    fn objects_mut(&mut self) -> &mut Objects {
        &mut self.objects
    }
}

/// Reports every message it receives and completes it only once a permit is available.
struct GatedPeer {
    started: mpsc::UnboundedSender<Vec<u8>>,
    gate: Arc<Semaphore>,
}

impl Peer for GatedPeer {
    fn forward(&mut self, message: RelayMessage) -> BoxFuture<'_, Result<(), PeerError>> {
        Box::pin(async move {
            let _ = self.started.send(message.bytes);
            let permit = self.gate.acquire().await.map_err(|_| PeerError::Closed)?;
            permit.forget();
            Ok(())
        })
    }
}

struct Harness {
    kinds: Arc<Interface>,
    inbound: mpsc::Sender<Inbound>,
    handled: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedReceiver<EncodedMessage>,
    handle: ConnectionHandle<Recorder>,
}

/// Reports the request it received and never completes.
struct Stalled;

impl RequestHandler<Recorder> for Stalled {
    fn handle<'a>(
        &'a self,
        session: &'a mut Recorder,
        request: Request<'a>,
    ) -> BoxFuture<'a, Result<NextAction, DispatchError>> {
        let _ = session.handled.send(request.message.name.clone());
        Box::pin(future::pending())
    }
}

fn start<P: Peer>(role: HostRole, peer: P) -> Harness {
    start_with(role, peer, |_, _| ())
}

fn stall_move(dispatcher: &mut Dispatcher<Recorder>, kinds: &Interface) {
    dispatcher.register(kinds, "move", Stalled).unwrap();
}

/// The `label` handler of the test session relays labels starting with `relay`, waits for
/// labels starting with `wait`, and handles everything else locally.
fn start_with<P, F>(role: HostRole, peer: P, register: F) -> Harness
where
    P: Peer,
    F: FnOnce(&mut Dispatcher<Recorder>, &Interface),
{
    let kinds = interface("test_kinds");
    let mut dispatcher = Dispatcher::new(role);
    dispatcher
        .register_fn(&kinds, "label", |session: &mut Recorder, request| {
            let text = match &request.args[0] {
                ArgValue::String(Some(s)) => s.clone(),
                _ => String::new(),
            };
            let action = if text.starts_with("relay") {
                NextAction::Relay
            } else if text.starts_with("wait") {
                NextAction::RelayWait
            } else {
                NextAction::Nop
            };
            let _ = session.handled.send(text);
            Ok(action)
        })
        .unwrap();
    register(&mut dispatcher, &kinds);
    let (handled_tx, handled) = mpsc::unbounded_channel();
    let mut objects = Objects::default();
    objects
        .insert(Resource::new(KINDS_ID, kinds.clone(), 3, ()))
        .unwrap();
    let session = Recorder {
        objects,
        handled: handled_tx,
    };
    let (sink, events) = event_channel();
    let (inbound, inbound_rx) = mpsc::channel(16);
    let handle = Connection::new(session, Arc::new(dispatcher), sink).spawn(peer, inbound_rx);
    Harness {
        kinds,
        inbound,
        handled,
        events,
        handle,
    }
}

fn gated() -> (GatedPeer, mpsc::UnboundedReceiver<Vec<u8>>, Arc<Semaphore>) {
    let (started, started_rx) = mpsc::unbounded_channel();
    let gate = Arc::new(Semaphore::new(0));
    let peer = GatedPeer {
        started,
        gate: gate.clone(),
    };
    (peer, started_rx, gate)
}

impl Harness {
    fn message(&self, request: &str, values: &[ArgValue]) -> RawMessage {
        let message = self.kinds.request_by_name(request).unwrap();
        RawMessage {
            object: KINDS_ID,
            opcode: message.opcode,
            bytes: encode(KINDS_ID, message, values).unwrap().bytes,
        }
    }

    async fn label(&self, text: &str) -> Vec<u8> {
        let message = self.message("label", &[ArgValue::String(Some(text.to_string()))]);
        let bytes = message.bytes.clone();
        self.send(message, vec![]).await;
        bytes
    }

    async fn send(&self, message: RawMessage, fds: Vec<uapi::OwnedFd>) {
        self.inbound.send(Inbound { message, fds }).await.unwrap();
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn relay_wait_blocks_next_request() {
    let (peer, mut started, gate) = gated();
    let mut h = start(HostRole::Interceptor, peer);
    let first = h.label("wait for me").await;
    h.label("after").await;
    assert_eq!(h.handled.recv().await.unwrap(), "wait for me");
    assert_eq!(started.recv().await.unwrap(), first);
    settle().await;
    assert!(h.handled.try_recv().is_err());
    gate.add_permits(1);
    assert_eq!(h.handled.recv().await.unwrap(), "after");
    drop(h.inbound);
    h.handle.join().await.unwrap();
    assert!(started.try_recv().is_err());
}

#[tokio::test]
async fn relay_does_not_block() {
    let (peer, mut started, _gate) = gated();
    let mut h = start(HostRole::Interceptor, peer);
    let first = h.label("relay one").await;
    h.label("after").await;
    assert_eq!(h.handled.recv().await.unwrap(), "relay one");
    assert_eq!(h.handled.recv().await.unwrap(), "after");
    assert_eq!(started.recv().await.unwrap(), first);
    h.handle.close();
    h.handle.join().await.unwrap();
}

#[tokio::test]
async fn close_abandons_relay_wait() {
    let (peer, mut started, _gate) = gated();
    let mut h = start(HostRole::Interceptor, peer);
    h.label("wait forever").await;
    h.label("never").await;
    assert_eq!(h.handled.recv().await.unwrap(), "wait forever");
    started.recv().await.unwrap();
    h.handle.close();
    let session = h.handle.join().await.unwrap();
    assert!(h.handled.try_recv().is_err());
    assert!(session.objects.get(KINDS_ID).is_some());
}

#[tokio::test]
async fn close_abandons_running_handler() {
    let (peer, _relayed) = mpsc::channel::<RelayMessage>(16);
    let mut h = start_with(HostRole::Interceptor, peer, stall_move);
    h.send(h.message("move", &[]), vec![]).await;
    h.label("never").await;
    assert_eq!(h.handled.recv().await.unwrap(), "move");
    h.handle.close();
    let session = tokio::time::timeout(Duration::from_secs(5), h.handle.join())
        .await
        .unwrap()
        .unwrap();
    assert!(session.objects.get(KINDS_ID).is_some());
    assert!(h.handled.try_recv().is_err());
}

#[tokio::test]
async fn dropping_the_handle_aborts_the_connection() {
    let (peer, _relayed) = mpsc::channel::<RelayMessage>(16);
    let mut h = start_with(HostRole::Interceptor, peer, stall_move);
    h.send(h.message("move", &[]), vec![]).await;
    assert_eq!(h.handled.recv().await.unwrap(), "move");
    drop(h.handle);
    let next = tokio::time::timeout(Duration::from_secs(5), h.handled.recv())
        .await
        .unwrap();
    assert!(next.is_none());
}

#[tokio::test]
async fn relayed_in_order_with_fds() {
    let (peer, mut relayed) = mpsc::channel::<RelayMessage>(16);
    let h = start(HostRole::Interceptor, peer);
    let first = h.label("relay a").await;
    let (a, b) = (eventfd(), eventfd());
    let (ra, rb) = (a.raw(), b.raw());
    let two_fds = h.message("two_fds", &[fd_arg(), fd_arg()]);
    let second = two_fds.bytes.clone();
    h.send(two_fds, vec![a, b]).await;
    h.label("local").await;
    let third = h.label("wait b").await;
    drop(h.inbound);
    h.handle.join().await.unwrap();
    let mut seen = vec![];
    while let Ok(message) = relayed.try_recv() {
        seen.push(message);
    }
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].bytes, first);
    assert!(seen[0].fds.is_empty());
    assert_eq!(seen[1].bytes, second);
    let fds: Vec<_> = seen[1].fds.iter().map(|fd| fd.raw()).collect();
    assert_eq!(fds, [ra, rb]);
    assert_eq!(seen[2].bytes, third);
}

#[tokio::test]
async fn observer_relays_nothing() {
    let (peer, mut relayed) = mpsc::channel::<RelayMessage>(16);
    let mut h = start(HostRole::Observer, peer);
    h.label("relay a").await;
    h.label("wait b").await;
    h.send(h.message("move", &[]), vec![]).await;
    drop(h.inbound);
    h.handle.join().await.unwrap();
    assert_eq!(h.handled.recv().await.unwrap(), "relay a");
    assert_eq!(h.handled.recv().await.unwrap(), "wait b");
    assert!(relayed.try_recv().is_err());
}

#[tokio::test]
async fn invalid_requests_report_and_continue() {
    let (peer, _relayed) = mpsc::channel::<RelayMessage>(16);
    let mut h = start(HostRole::Interceptor, peer);
    let display = interface("wl_display");
    let error = display.event_by_name("error").unwrap();

    let mut bad_opcode = h.message("move", &[]);
    bad_opcode.opcode = 9;
    h.send(bad_opcode, vec![]).await;
    let mut unknown = h.message("move", &[]);
    unknown.object = ObjectId::from_raw(55);
    h.send(unknown, vec![]).await;
    let mut short = h.message("label", &[ArgValue::String(Some("abc".to_string()))]);
    short.bytes.truncate(short.bytes.len() - 4);
    h.send(short, vec![]).await;
    h.label("still alive").await;
    assert_eq!(h.handled.recv().await.unwrap(), "still alive");

    let mut errors = vec![];
    for _ in 0..3 {
        let event = h.events.recv().await.unwrap();
        let (object, opcode, _) = RawMessage::parse_header(&event.bytes).unwrap();
        assert_eq!(object, DISPLAY_ID);
        assert_eq!(opcode, error.opcode);
        let args = decode_args(error, &event.bytes[8..], &mut FdQueue::default()).unwrap();
        errors.push(args);
    }
    assert_eq!(
        &errors[0][..],
        &[
            ArgValue::Object(KINDS_ID),
            ArgValue::Uint(INVALID_METHOD),
            ArgValue::String(Some("opcode=9 args=[] not found".to_string())),
        ],
    );
    assert_eq!(errors[1][0], ArgValue::Object(ObjectId::from_raw(55)));
    assert_eq!(errors[1][1], ArgValue::Uint(INVALID_OBJECT));
    assert_eq!(errors[2][1], ArgValue::Uint(INVALID_METHOD));
    h.handle.close();
    h.handle.join().await.unwrap();
}

#[test]
fn events_are_encoded_for_their_object() {
    let kinds = interface("test_kinds");
    let notify = kinds.event_by_name("notify").unwrap();
    let hello = [ArgValue::String(Some("hello".to_string()))];
    let (sink, mut events) = event_channel();
    sink.event(KINDS_ID, notify, &hello).unwrap();
    let event = events.try_recv().unwrap();
    let (object, opcode, len) = RawMessage::parse_header(&event.bytes).unwrap();
    assert_eq!(object, KINDS_ID);
    assert_eq!(opcode, notify.opcode);
    assert_eq!(len, event.bytes.len());
    let args = decode_args(notify, &event.bytes[8..], &mut FdQueue::default()).unwrap();
    assert_eq!(&args[..], &hello);
    let err = sink.event(KINDS_ID, notify, &[]).err().unwrap();
    assert!(matches!(err, EventError::Encode(_)));
    drop(events);
    let err = sink.event(KINDS_ID, notify, &hello).err().unwrap();
    assert!(matches!(err, EventError::Closed));
}
