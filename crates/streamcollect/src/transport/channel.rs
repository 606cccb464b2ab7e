// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport backed by channels.
//!
//! Each registered endpoint gets its own delivery thread. Samples are passed
//! through unfiltered, modelling an aggregator that ignores the rule.

use super::{SampleSink, Transport, TransportError};
use crate::config::Endpoint;
use crate::rule::SubscriptionRule;
use crate::sample::SampleRecord;
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

struct Route {
    tx: mpsc::Sender<SampleRecord>,
    worker: JoinHandle<u64>,
}

#[derive(Default)]
struct Routes {
    open: HashMap<Endpoint, Route>,
    closed: bool,
}

/// In-process transport.
#[derive(Default)]
pub struct ChannelTransport {
    routes: Mutex<Routes>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a sample on an endpoint's delivery thread.
    ///
    /// Returns `false` if the endpoint was never registered or its thread
    /// has exited.
    pub fn publish(&self, endpoint: &Endpoint, sample: SampleRecord) -> bool {
        let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        match routes.open.get(endpoint) {
            Some(route) => route.tx.send(sample).is_ok(),
            None => false,
        }
    }

    /// Endpoints currently registered.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .open
            .keys()
            .cloned()
            .collect()
    }

    /// Close every channel and wait for the delivery threads to drain.
    ///
    /// Returns the number of samples delivered per endpoint.
    pub fn shutdown(&self) -> HashMap<Endpoint, u64> {
        let routes = {
            let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            routes.closed = true;
            std::mem::take(&mut routes.open)
        };

        routes
            .into_iter()
            .map(|(endpoint, route)| {
                drop(route.tx);
                let delivered = route.worker.join().unwrap_or_else(|_| {
                    tracing::warn!(%endpoint, "Delivery thread panicked");
                    0
                });
                (endpoint, delivered)
            })
            .collect()
    }
}

impl Transport for ChannelTransport {
    fn register(
        &self,
        endpoint: &Endpoint,
        rule: &SubscriptionRule,
        sink: Arc<dyn SampleSink>,
    ) -> Result<(), TransportError> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if routes.closed {
            return Err(TransportError::Closed);
        }
        if routes.open.contains_key(endpoint) {
            return Err(TransportError::AlreadyRegistered(endpoint.to_string()));
        }

        tracing::debug!(
            %endpoint,
            physical_layer = rule.physical_layer,
            txers = rule.txers.len(),
            "Registering in-process subscription"
        );

        let (tx, rx) = mpsc::channel::<SampleRecord>();
        let worker = thread::Builder::new()
            .name(format!("deliver-{}", endpoint))
            .spawn(move || {
                let mut delivered = 0u64;
                for sample in rx {
                    sink.deliver(sample);
                    delivered += 1;
                }
                delivered
            })?;

        routes.open.insert(endpoint.clone(), Route { tx, worker });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collect(Mutex<Vec<SampleRecord>>);

    impl SampleSink for Collect {
        fn deliver(&self, sample: SampleRecord) {
            self.0.lock().unwrap().push(sample);
        }
    }

    #[test]
    fn test_publish_delivers_in_order() {
        let transport = ChannelTransport::new();
        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        let endpoint = Endpoint::new("local", 1);

        transport
            .register(&endpoint, &SubscriptionRule::default(), sink.clone())
            .unwrap();

        for ts in 0..50 {
            assert!(transport.publish(&endpoint, SampleRecord::new(1, 2).with_timestamp(ts)));
        }

        let delivered = transport.shutdown();
        assert_eq!(delivered.get(&endpoint), Some(&50));

        let samples = sink.0.lock().unwrap();
        let stamps: Vec<i64> = samples.iter().map(|s| s.rx_timestamp).collect();
        assert_eq!(stamps, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_unknown_endpoint() {
        let transport = ChannelTransport::new();
        assert!(!transport.publish(&Endpoint::new("nowhere", 9), SampleRecord::new(1, 1)));
    }

    #[test]
    fn test_duplicate_registration() {
        let transport = ChannelTransport::new();
        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        let endpoint = Endpoint::new("local", 1);
        let rule = SubscriptionRule::default();

        transport.register(&endpoint, &rule, sink.clone()).unwrap();
        let err = transport.register(&endpoint, &rule, sink).unwrap_err();
        assert!(matches!(err, TransportError::AlreadyRegistered(_)));
        assert_eq!(transport.endpoints(), vec![endpoint]);
        transport.shutdown();
    }

    #[test]
    fn test_register_after_shutdown() {
        let transport = ChannelTransport::new();
        transport.shutdown();

        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        let err = transport
            .register(&Endpoint::new("local", 1), &SubscriptionRule::default(), sink)
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn test_register_racing_shutdown_is_joined_or_refused() {
        let transport = Arc::new(ChannelTransport::new());
        let sink: Arc<dyn SampleSink> = Arc::new(Collect(Mutex::new(Vec::new())));

        let registrars: Vec<_> = (0..8u16)
            .map(|port| {
                let transport = transport.clone();
                let sink = sink.clone();
                thread::spawn(move || {
                    let endpoint = Endpoint::new("local", port);
                    let result =
                        transport.register(&endpoint, &SubscriptionRule::default(), sink);
                    (endpoint, result)
                })
            })
            .collect();

        let joined = transport.shutdown();
        for registrar in registrars {
            let (endpoint, result) = registrar.join().unwrap();
            match result {
                Ok(()) => assert!(joined.contains_key(&endpoint), "{} leaked", endpoint),
                Err(e) => assert!(matches!(e, TransportError::Closed)),
            }
        }
        assert!(transport.endpoints().is_empty());
    }
}
