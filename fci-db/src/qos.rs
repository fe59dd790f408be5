//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// QoS object tables. Grounded on `fci_qos.c` (original_source) for the
// queue/scheduler/shaper/policer shape; the per-interface queue-length
// budget check is implemented as a validate-then-commit pass so a
// rejected update leaves every queue on the interface untouched.

use std::collections::BTreeMap;

use fci_types::{PhyIfId, ReturnCode};

use crate::error::Error;

pub const WRED_ZONES: usize = 32;
pub const SCHEDULER_INPUTS: usize = 32;
pub const WRED_ZONE_INVALID: u8 = 255;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueueMode {
    Disabled,
    Default,
    TailDrop,
    Wred,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WredZone {
    pub min: u16,
    pub max: u16,
    pub drop_probability: u8,
}

#[derive(Clone, Debug)]
pub struct Queue {
    pub mode: QueueMode,
    pub max_len: u16,
    pub wred_zones: [Option<WredZone>; WRED_ZONES],
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            mode: QueueMode::Default,
            max_len: 0,
            wred_zones: [None; WRED_ZONES],
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SchedInput {
    pub weight: u16,
    pub source: u8,
}

#[derive(Clone, Debug)]
pub struct Scheduler {
    pub inputs: [Option<SchedInput>; SCHEDULER_INPUTS],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            inputs: [None; SCHEDULER_INPUTS],
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShaperMode {
    Disabled,
    DataRate,
    PacketRate,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Shaper {
    pub mode: Option<ShaperMode>,
    pub min_credit: i32,
    pub max_credit: i32,
    pub idle_slope: u32,
    pub position: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicerQueue {
    Dmem,
    Lmem,
    Rxf,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PolicerFlow {
    pub match_bits: u32,
}

#[derive(Default)]
struct PerInterface {
    queues: BTreeMap<u8, Queue>,
    schedulers: BTreeMap<u8, Scheduler>,
    shapers: BTreeMap<u8, Shaper>,
    queue_budget: u32,
    policer_enabled: bool,
    policer_flows: Vec<Option<PolicerFlow>>,
    policer_wred: BTreeMap<(PolicerQueue, u8), WredZone>,
    policer_shapers: BTreeMap<u8, Shaper>,
}

impl PerInterface {
    fn sum_queue_lengths(&self, excluding: Option<u8>) -> u32 {
        self.queues
            .iter()
            .filter(|(id, _)| Some(**id) != excluding)
            .map(|(_, q)| q.max_len as u32)
            .sum()
    }
}

pub struct QosTables {
    per_if: BTreeMap<PhyIfId, PerInterface>,
}

impl Default for QosTables {
    fn default() -> Self {
        Self {
            per_if: BTreeMap::new(),
        }
    }
}

impl QosTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or raises the queue-length budget for an interface. The
    /// default is the accelerator's per-interface budget; tests use a
    /// smaller one to exercise the overflow path cheaply.
    pub fn set_budget(&mut self, iface: PhyIfId, budget: u32) {
        self.per_if.entry(iface).or_default().queue_budget = budget;
    }

    pub fn queue(&self, iface: PhyIfId, id: u8) -> Option<&Queue> {
        self.per_if.get(&iface)?.queues.get(&id)
    }

    /// Updates a queue. If the new `max_len` would push the interface's
    /// total queue length over budget, the update is rejected and every
    /// queue on the interface is left exactly as it was.
    pub fn update_queue(
        &mut self,
        iface: PhyIfId,
        id: u8,
        mode: QueueMode,
        max_len: u16,
        wred_zones: [Option<WredZone>; WRED_ZONES],
    ) -> Result<(), Error> {
        let entry = self.per_if.entry(iface).or_default();
        let projected = entry.sum_queue_lengths(Some(id)) + max_len as u32;
        if entry.queue_budget > 0 && projected > entry.queue_budget {
            return Err(Error::Invalid(ReturnCode::QosQueueSumOfLengthsExceeded));
        }
        entry.queues.insert(
            id,
            Queue {
                mode,
                max_len,
                wred_zones,
            },
        );
        Ok(())
    }

    pub fn scheduler(&self, iface: PhyIfId, id: u8) -> Option<&Scheduler> {
        self.per_if.get(&iface)?.schedulers.get(&id)
    }

    /// Setting every input's source to `None` (mode=0 on the wire)
    /// disables the scheduler entirely.
    pub fn update_scheduler(&mut self, iface: PhyIfId, id: u8, inputs: [Option<SchedInput>; SCHEDULER_INPUTS]) {
        self.per_if
            .entry(iface)
            .or_default()
            .schedulers
            .insert(id, Scheduler { inputs });
    }

    pub fn shaper(&self, iface: PhyIfId, id: u8) -> Option<&Shaper> {
        self.per_if.get(&iface)?.shapers.get(&id)
    }

    pub fn update_shaper(&mut self, iface: PhyIfId, id: u8, shaper: Shaper) {
        self.per_if.entry(iface).or_default().shapers.insert(id, shaper);
    }

    pub fn set_policer_enabled(&mut self, iface: PhyIfId, enabled: bool) {
        self.per_if.entry(iface).or_default().policer_enabled = enabled;
    }

    pub fn policer_enabled(&self, iface: PhyIfId) -> bool {
        self.per_if.get(&iface).map(|e| e.policer_enabled).unwrap_or(false)
    }

    /// Registers a flow at `position`; `0xFF` means "first free slot".
    pub fn policer_flow_register(
        &mut self,
        iface: PhyIfId,
        position: u8,
        flow: PolicerFlow,
    ) -> Result<u8, Error> {
        let entry = self.per_if.entry(iface).or_default();
        const FLOW_TABLE_SIZE: usize = 64;
        if entry.policer_flows.len() < FLOW_TABLE_SIZE {
            entry
                .policer_flows
                .resize_with(FLOW_TABLE_SIZE, || None);
        }
        let pos = if position == 0xFF {
            entry
                .policer_flows
                .iter()
                .position(|f| f.is_none())
                .ok_or(Error::Capacity(ReturnCode::QosPolicerFlowTableFull))?
        } else {
            position as usize
        };
        if pos >= entry.policer_flows.len() {
            return Err(Error::Capacity(ReturnCode::QosPolicerFlowTableFull));
        }
        entry.policer_flows[pos] = Some(flow);
        Ok(pos as u8)
    }

    pub fn policer_flow_deregister(&mut self, iface: PhyIfId, position: u8) -> Result<(), Error> {
        let entry = self
            .per_if
            .get_mut(&iface)
            .ok_or(Error::NotFound(ReturnCode::QosPolicerFlowNotFound))?;
        let slot = entry
            .policer_flows
            .get_mut(position as usize)
            .ok_or(Error::NotFound(ReturnCode::QosPolicerFlowNotFound))?;
        if slot.take().is_none() {
            return Err(Error::NotFound(ReturnCode::QosPolicerFlowNotFound));
        }
        Ok(())
    }

    pub fn policer_flows(&self, iface: PhyIfId) -> impl Iterator<Item = (u8, &PolicerFlow)> {
        self.per_if
            .get(&iface)
            .into_iter()
            .flat_map(|e| e.policer_flows.iter().enumerate())
            .filter_map(|(i, f)| f.as_ref().map(|f| (i as u8, f)))
    }

    pub fn set_policer_wred(&mut self, iface: PhyIfId, queue: PolicerQueue, id: u8, zone: WredZone) {
        self.per_if
            .entry(iface)
            .or_default()
            .policer_wred
            .insert((queue, id), zone);
    }

    pub fn set_policer_shaper(&mut self, iface: PhyIfId, id: u8, shaper: Shaper) {
        self.per_if
            .entry(iface)
            .or_default()
            .policer_shapers
            .insert(id, shaper);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn queue_update_exceeding_budget_is_rolled_back() {
        let mut qos = QosTables::new();
        let iface = PhyIfId(0);
        qos.set_budget(iface, 255);
        for id in 0..3u8 {
            qos.update_queue(iface, id, QueueMode::TailDrop, 120, [None; WRED_ZONES])
                .unwrap();
        }
        let err = qos
            .update_queue(iface, 0, QueueMode::Wred, 100, [None; WRED_ZONES])
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::QosQueueSumOfLengthsExceeded);
        assert_eq!(qos.queue(iface, 0).unwrap().max_len, 120);
    }

    #[test]
    fn policer_flow_first_free_slot() {
        let mut qos = QosTables::new();
        let iface = PhyIfId(0);
        let a = qos.policer_flow_register(iface, 0xFF, PolicerFlow::default()).unwrap();
        let b = qos.policer_flow_register(iface, 0xFF, PolicerFlow::default()).unwrap();
        assert_ne!(a, b);
        qos.policer_flow_deregister(iface, a).unwrap();
        assert!(qos.policer_flow_deregister(iface, a).is_err());
    }
}
