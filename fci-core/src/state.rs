//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// The full set of in-memory configuration databases an endpoint holds,
// bundled behind a single database mutex covering every table
// uniformly, since none of the tables have a more specific lock of
// their own than the one the route DB and connection DB were originally
// called out for.

use fci_db::{
    conntrack::ConntrackDb, feature::FeatureRegistry, flexparser::FlexParserDb, ifview::InterfaceView,
    l2::L2Store, mirror::MirrorRegistry, qos::QosTables, route::RouteDb, spd::SpdTables,
};

#[derive(Default)]
pub struct Databases {
    pub route: RouteDb,
    pub conntrack: ConntrackDb,
    pub ifview: InterfaceView,
    pub qos: QosTables,
    pub flexparser: FlexParserDb,
    pub l2: L2Store,
    pub feature: FeatureRegistry,
    pub spd: SpdTables,
    pub mirror: MirrorRegistry,
}

impl Databases {
    pub fn new() -> Self {
        Self::default()
    }
}
