//! Node abstraction and the topology graph.
//!
//! Every simulated role — channel, source, relay, sink — implements
//! [`Node`]: an immutable string id, an ordered list of downstream
//! edges, and the `receive`/`tick` contract. Nodes live in an arena
//! ([`Graph`]) and refer to each other by copyable [`NodeHandle`]s, so
//! fan-in (several relays feeding one sink) needs no reference-counted
//! cycles.
//!
//! # Delivery model
//!
//! Dispatch is synchronous within a tick. A node's `tick` or `receive`
//! stages packets into a [`NodeContext`] outbox; when the node returns,
//! the graph drains the outbox, invoking each target's `receive` (which
//! may stage further sends) until the cascade is exhausted. One tick
//! therefore fully completes, including every transitive `receive`,
//! before the next begins.
//!
//! # Wiring rules
//!
//! Edges are appended during topology construction via
//! [`Graph::connect`] and are immutable afterwards — there is no
//! removal or reordering API. Node ids must be unique per graph;
//! self-edges are rejected.

use std::any::Any;

use crate::packet::Packet;

/// Stable handle to a node slot in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Index of the slot this handle refers to.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The base contract shared by channels, sources, relays, and sinks.
pub trait Node {
    /// Immutable id, unique within one simulation. Used for wiring
    /// diagnostics and counter-key composition.
    fn id(&self) -> &str;

    /// Accept an inbound packet. Semantics vary by role; a source
    /// panics here since it has no upstream.
    fn receive(&mut self, packet: Packet, ctx: &mut NodeContext<'_>);

    /// Perform this node's once-per-round action. Channels and sinks
    /// are purely reactive and do nothing here.
    fn tick(&mut self, ctx: &mut NodeContext<'_>);

    /// Append a downstream edge. Construction-time only.
    fn add_node(&mut self, downstream: NodeHandle);

    /// The ordered downstream edges.
    fn receivers(&self) -> &[NodeHandle];

    /// Downcast support for role-specific access through the graph.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Number of downstream edges.
    fn receiver_count(&self) -> usize {
        self.receivers().len()
    }

    /// The downstream node at edge `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    fn get_receiver(&self, index: usize) -> NodeHandle {
        self.receivers()[index]
    }

    /// Deliver `packet` to the single downstream edge `index`.
    fn forward(&self, index: usize, packet: Packet, ctx: &mut NodeContext<'_>) {
        ctx.send(self.get_receiver(index), packet);
    }

    /// Deliver a copy of `packet` to every downstream edge.
    ///
    /// Copies share the buffer until a receiver mutates its own.
    fn broadcast(&self, packet: &Packet, ctx: &mut NodeContext<'_>) {
        for index in 0..self.receiver_count() {
            self.forward(index, packet.clone(), ctx);
        }
    }
}

/// Per-dispatch view handed to a node's `tick`/`receive`.
///
/// Collects outbound packets and answers id lookups for per-edge
/// counter keys. All graph mutation funnels through the outbox, which
/// the graph drains after the node returns.
pub struct NodeContext<'a> {
    graph: &'a Graph,
    outbox: Vec<(NodeHandle, Packet)>,
}

impl NodeContext<'_> {
    /// Stage `packet` for delivery to `to` within the current tick.
    pub fn send(&mut self, to: NodeHandle, packet: Packet) {
        self.outbox.push((to, packet));
    }

    /// Id of the node behind `handle`.
    ///
    /// # Panics
    /// If `handle` refers to the node currently dispatching (nodes
    /// cannot introspect themselves through the graph).
    pub fn node_id(&self, handle: NodeHandle) -> &str {
        self.graph.node(handle).id()
    }
}

enum Dispatch {
    Tick,
    Receive(Packet),
}

/// Arena owning every node of one simulation.
#[derive(Default)]
pub struct Graph {
    slots: Vec<Option<Box<dyn Node>>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Add a node, returning its handle.
    ///
    /// # Panics
    /// If another node already carries the same id — counter keys
    /// derived from (sender, receiver) pairs must stay unambiguous.
    pub fn insert(&mut self, node: Box<dyn Node>) -> NodeHandle {
        let duplicate = self
            .slots
            .iter()
            .flatten()
            .any(|existing| existing.id() == node.id());
        assert!(!duplicate, "duplicate node id '{}'", node.id());

        self.slots.push(Some(node));
        NodeHandle(self.slots.len() - 1)
    }

    /// Append an edge from `from` to `to`.
    ///
    /// # Panics
    /// If either handle is invalid or `from == to`.
    pub fn connect(&mut self, from: NodeHandle, to: NodeHandle) {
        assert!(from != to, "self-edges are not allowed");
        assert!(
            to.index() < self.slots.len(),
            "downstream handle {to:?} does not exist"
        );
        self.node_mut(from).add_node(to);
    }

    /// Shared access to a node.
    ///
    /// # Panics
    /// If the handle is invalid or the node is mid-dispatch.
    pub fn node(&self, handle: NodeHandle) -> &dyn Node {
        self.slots[handle.index()]
            .as_deref()
            .unwrap_or_else(|| panic!("node {handle:?} is currently dispatching"))
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, handle: NodeHandle) -> &mut dyn Node {
        self.slots[handle.index()]
            .as_deref_mut()
            .unwrap_or_else(|| panic!("node {handle:?} is currently dispatching"))
    }

    /// Role-typed access to a node.
    ///
    /// # Panics
    /// If the node behind `handle` is not a `T`.
    pub fn get<T: Node + 'static>(&self, handle: NodeHandle) -> &T {
        self.node(handle)
            .as_any()
            .downcast_ref()
            .unwrap_or_else(|| panic!("node {handle:?} has a different role"))
    }

    /// Role-typed mutable access to a node.
    pub fn get_mut<T: Node + 'static>(&mut self, handle: NodeHandle) -> &mut T {
        self.node_mut(handle)
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| panic!("node {handle:?} has a different role"))
    }

    /// Invoke `tick` on one node, then drain the resulting delivery
    /// cascade to completion.
    pub fn dispatch_tick(&mut self, handle: NodeHandle) {
        self.dispatch(handle, Dispatch::Tick);
    }

    /// Deliver one packet to a node, draining the cascade.
    pub fn deliver(&mut self, handle: NodeHandle, packet: Packet) {
        self.dispatch(handle, Dispatch::Receive(packet));
    }

    fn dispatch(&mut self, handle: NodeHandle, event: Dispatch) {
        // Check the node out of its slot so the context can borrow the
        // rest of the graph for id lookups.
        let mut node = self.slots[handle.index()]
            .take()
            .unwrap_or_else(|| panic!("node {handle:?} is already dispatching"));

        let outbox = {
            let mut ctx = NodeContext {
                graph: &*self,
                outbox: Vec::new(),
            };
            match event {
                Dispatch::Tick => node.tick(&mut ctx),
                Dispatch::Receive(packet) => node.receive(packet, &mut ctx),
            }
            ctx.outbox
        };

        self.slots[handle.index()] = Some(node);

        for (to, packet) in outbox {
            self.dispatch(to, Dispatch::Receive(packet));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records everything it receives and optionally forwards onward.
    struct Recorder {
        id: String,
        receivers: Vec<NodeHandle>,
        received: Vec<Packet>,
        forward_on_receive: bool,
        ticks: u32,
    }

    impl Recorder {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                receivers: Vec::new(),
                received: Vec::new(),
                forward_on_receive: false,
                ticks: 0,
            }
        }

        fn forwarding(id: &str) -> Self {
            Self {
                forward_on_receive: true,
                ..Self::new(id)
            }
        }
    }

    impl Node for Recorder {
        fn id(&self) -> &str {
            &self.id
        }

        fn receive(&mut self, packet: Packet, ctx: &mut NodeContext<'_>) {
            if self.forward_on_receive {
                self.broadcast(&packet, ctx);
            }
            self.received.push(packet);
        }

        fn tick(&mut self, _ctx: &mut NodeContext<'_>) {
            self.ticks += 1;
        }

        fn add_node(&mut self, downstream: NodeHandle) {
            self.receivers.push(downstream);
        }

        fn receivers(&self) -> &[NodeHandle] {
            &self.receivers
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_edges_keep_insertion_order() {
        let mut graph = Graph::new();
        let a = graph.insert(Box::new(Recorder::new("a")));
        let b = graph.insert(Box::new(Recorder::new("b")));
        let c = graph.insert(Box::new(Recorder::new("c")));

        graph.connect(a, c);
        graph.connect(a, b);

        let node = graph.node(a);
        assert_eq!(node.receiver_count(), 2);
        assert_eq!(node.get_receiver(0), c);
        assert_eq!(node.get_receiver(1), b);
    }

    #[test]
    fn test_delivery_cascades_within_one_dispatch() {
        // a -> b -> c: delivering to a reaches c before deliver returns.
        let mut graph = Graph::new();
        let a = graph.insert(Box::new(Recorder::forwarding("a")));
        let b = graph.insert(Box::new(Recorder::forwarding("b")));
        let c = graph.insert(Box::new(Recorder::new("c")));
        graph.connect(a, b);
        graph.connect(b, c);

        graph.deliver(a, Packet::new("test", vec![9]));

        assert_eq!(graph.get::<Recorder>(a).received.len(), 1);
        assert_eq!(graph.get::<Recorder>(b).received.len(), 1);
        assert_eq!(graph.get::<Recorder>(c).received.len(), 1);
        assert_eq!(graph.get::<Recorder>(c).received[0].bytes(), &[9]);
    }

    #[test]
    fn test_fan_in_shares_downstream_node() {
        // Two upstream nodes target the same downstream node.
        let mut graph = Graph::new();
        let up1 = graph.insert(Box::new(Recorder::forwarding("up1")));
        let up2 = graph.insert(Box::new(Recorder::forwarding("up2")));
        let down = graph.insert(Box::new(Recorder::new("down")));
        graph.connect(up1, down);
        graph.connect(up2, down);

        graph.deliver(up1, Packet::new("t", vec![1]));
        graph.deliver(up2, Packet::new("t", vec![2]));

        assert_eq!(graph.get::<Recorder>(down).received.len(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate node id")]
    fn test_duplicate_id_panics() {
        let mut graph = Graph::new();
        graph.insert(Box::new(Recorder::new("same")));
        graph.insert(Box::new(Recorder::new("same")));
    }

    #[test]
    #[should_panic(expected = "self-edges")]
    fn test_self_edge_panics() {
        let mut graph = Graph::new();
        let a = graph.insert(Box::new(Recorder::new("a")));
        graph.connect(a, a);
    }

    #[test]
    fn test_tick_dispatch() {
        let mut graph = Graph::new();
        let a = graph.insert(Box::new(Recorder::new("a")));
        graph.dispatch_tick(a);
        graph.dispatch_tick(a);
        assert_eq!(graph.get::<Recorder>(a).ticks, 2);
    }
}
