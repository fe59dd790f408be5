//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Command codes and protocol return codes. Values are taken from the
// accelerator's public FCI command-code header where known (the upper
// nibble 0xf marks "extension" commands); commands the header didn't
// expose are assigned values in the same 0xf2xx/0xf6xx bands reserved for
// the route/conntrack family so the overall numbering stays internally
// consistent.

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum CommandCode {
    DataBufPut = 0xf300,
    IfLockSession = 0x0015,
    IfUnlockSession = 0x0016,
    LogIf = 0xf101,
    PhyIf = 0xf100,
    IfMac = 0xf120,
    IpRoute = 0xf230,
    Ipv4Reset = 0xf231,
    Ipv6Reset = 0xf232,
    Ipv4Conntrack = 0xf233,
    Ipv6Conntrack = 0xf234,
    Ipv4SetTimeout = 0xf235,
    L2Bd = 0xf200,
    L2StaticEnt = 0xf340,
    L2FlushAll = 0xf3a0,
    L2FlushLearned = 0xf380,
    L2FlushStatic = 0xf390,
    FpTable = 0xf220,
    FpRule = 0xf221,
    FwFeature = 0xf250,
    FwFeatureElement = 0xf251,
    Mirror = 0xf130,
    QosQueue = 0xf400,
    QosScheduler = 0xf410,
    QosShaper = 0xf420,
    QosPolicer = 0xf430,
    QosPolicerFlow = 0xf440,
    QosPolicerWred = 0xf450,
    QosPolicerShp = 0xf460,
    Spd = 0xf226,
    FciOwnershipLock = 0xf500,
    FciOwnershipUnlock = 0xf501,
}

impl CommandCode {
    pub fn from_u16(code: u16) -> Option<Self> {
        use CommandCode::*;
        Some(match code {
            0xf300 => DataBufPut,
            0x0015 => IfLockSession,
            0x0016 => IfUnlockSession,
            0xf101 => LogIf,
            0xf100 => PhyIf,
            0xf120 => IfMac,
            0xf230 => IpRoute,
            0xf231 => Ipv4Reset,
            0xf232 => Ipv6Reset,
            0xf233 => Ipv4Conntrack,
            0xf234 => Ipv6Conntrack,
            0xf235 => Ipv4SetTimeout,
            0xf200 => L2Bd,
            0xf340 => L2StaticEnt,
            0xf3a0 => L2FlushAll,
            0xf380 => L2FlushLearned,
            0xf390 => L2FlushStatic,
            0xf220 => FpTable,
            0xf221 => FpRule,
            0xf250 => FwFeature,
            0xf251 => FwFeatureElement,
            0xf130 => Mirror,
            0xf400 => QosQueue,
            0xf410 => QosScheduler,
            0xf420 => QosShaper,
            0xf430 => QosPolicer,
            0xf440 => QosPolicerFlow,
            0xf450 => QosPolicerWred,
            0xf460 => QosPolicerShp,
            0xf226 => Spd,
            0xf500 => FciOwnershipLock,
            0xf501 => FciOwnershipUnlock,
            _ => return None,
        })
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// `true` for the two codes handled directly by the ownership arbiter,
    /// which never reach the per-command handler table.
    pub fn is_ownership(self) -> bool {
        matches!(
            self,
            CommandCode::FciOwnershipLock | CommandCode::FciOwnershipUnlock
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum ReturnCode {
    Ok = 0x0000,
    UnknownCommand = 0x0001,
    UnknownAction = 0x0002,
    WrongCommandParam = 0x0003,
    EntryNotFound = 0xf104,
    InternalFailure = 0xffff,

    IfEntryAlreadyRegistered = 0xf103,
    IfEntryNotFound = 0xf104,
    IfResourceAlreadyLocked = 0xf110,
    IfWrongSessionId = 0xf111,

    IfMacAlreadyRegistered = 0xf121,
    IfMacNotFound = 0xf122,

    MirrorAlreadyRegistered = 0xf131,
    MirrorNotFound = 0xf132,

    L2BdAlreadyRegistered = 0xf201,
    L2BdNotFound = 0xf202,
    L2BdVlanReserved = 0xf203,

    FpRuleNotFound = 0xf222,

    L2StaticEntAlreadyRegistered = 0xf341,
    L2StaticEnNotFound = 0xf342,

    FwFeatureNotFound = 0xf251,
    FwFeatureNotAvailable = 0xf252,
    FwFeatureElementNotFound = 0xf253,

    QosQueueNotFound = 0xf401,
    QosQueueSumOfLengthsExceeded = 0xf402,
    QosSchedulerNotFound = 0xf411,
    QosShaperNotFound = 0xf421,
    QosPolicerFlowTableFull = 0xf441,
    QosPolicerFlowNotFound = 0xf442,

    SpdNotFound = 0xf227,
    RouteNotFound = 0xf236,
    ConntrackNotFound = 0xf237,
    FpTableNotFound = 0xf223,

    FciOwnershipNotAuthorized = 0xf502,
    FciOwnershipAlreadyLocked = 0xf503,
    FciOwnershipNotOwner = 0xf504,
    FciOwnershipNotEnabled = 0xf505,
}

impl ReturnCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} (0x{:04x})", self.as_u16())
    }
}
