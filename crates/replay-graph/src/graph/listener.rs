use crossbeam_channel::Sender;

#[derive(Debug, Clone, PartialEq)]
pub enum GraphNotice {
    NodeAdded(String),
    NodeRemoved(String),
    EdgeAdded(String),
    EdgeRemoved(String),
    LabelsChanged,
    /// Playback started (`true`) or finished catching up (`false`).
    Processing(bool),
    EventFailed { message: String, event: String },
    /// The layout pushed a node past the viewing volume; carries the new bound.
    ViewingVolumeReset(f64),
    RenderRequested,
}

/// Observer of graph changes. Every method defaults to doing nothing.
pub trait GraphListener: Send {
    fn on_notice(&mut self, notice: &GraphNotice) {
        match notice {
            GraphNotice::NodeAdded(name) => self.node_added(name),
            GraphNotice::NodeRemoved(name) => self.node_removed(name),
            GraphNotice::EdgeAdded(name) => self.edge_added(name),
            GraphNotice::EdgeRemoved(name) => self.edge_removed(name),
            GraphNotice::LabelsChanged => self.labels_changed(),
            GraphNotice::Processing(processing) => self.processing(*processing),
            GraphNotice::EventFailed { message, event } => self.event_failed(message, event),
            GraphNotice::ViewingVolumeReset(bound) => self.viewing_volume_reset(*bound),
            GraphNotice::RenderRequested => self.render_requested(),
        }
    }

    fn node_added(&mut self, _name: &str) {}

    fn node_removed(&mut self, _name: &str) {}

    fn edge_added(&mut self, _name: &str) {}

    fn edge_removed(&mut self, _name: &str) {}

    fn labels_changed(&mut self) {}

    fn processing(&mut self, _processing: bool) {}

    fn event_failed(&mut self, _message: &str, _event: &str) {}

    fn viewing_volume_reset(&mut self, _bound: f64) {}

    fn render_requested(&mut self) {}
}

impl GraphListener for Sender<GraphNotice> {
    fn on_notice(&mut self, notice: &GraphNotice) {
        // a dropped receiver just means nobody is watching any more
        let _ = self.send(notice.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl GraphListener for Recorder {
        fn node_added(&mut self, name: &str) {
            self.0.push(format!("+node {name}"));
        }

        fn node_removed(&mut self, name: &str) {
            self.0.push(format!("-node {name}"));
        }

        fn edge_added(&mut self, name: &str) {
            self.0.push(format!("+edge {name}"));
        }

        fn edge_removed(&mut self, name: &str) {
            self.0.push(format!("-edge {name}"));
        }

        fn labels_changed(&mut self) {
            self.0.push("labels".to_string());
        }

        fn event_failed(&mut self, message: &str, _event: &str) {
            self.0.push(message.to_string());
        }
    }

    #[test]
    fn default_dispatch_routes_failures() {
        let mut listener = Recorder::default();
        listener.on_notice(&GraphNotice::NodeAdded("a".into()));
        listener.on_notice(&GraphNotice::EdgeAdded("e".into()));
        listener.on_notice(&GraphNotice::LabelsChanged);
        listener.on_notice(&GraphNotice::EdgeRemoved("e".into()));
        listener.on_notice(&GraphNotice::NodeRemoved("a".into()));
        listener.on_notice(&GraphNotice::Processing(true));
        listener.on_notice(&GraphNotice::EventFailed {
            message: "boom".into(),
            event: "NodeCreate".into(),
        });
        assert_eq!(
            listener.0,
            vec!["+node a", "+edge e", "labels", "-edge e", "-node a", "boom"]
        );
    }

    #[test]
    fn channel_listener_forwards_everything() {
        let (mut tx, rx) = crossbeam_channel::unbounded();
        tx.on_notice(&GraphNotice::LabelsChanged);
        tx.on_notice(&GraphNotice::Processing(true));
        assert_eq!(rx.try_recv(), Ok(GraphNotice::LabelsChanged));
        assert_eq!(rx.try_recv(), Ok(GraphNotice::Processing(true)));
    }
}
