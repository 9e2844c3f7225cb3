//! Housekeeping telemetry decoding.
//!
//! The housekeeping report is the largest frame on the link: 48 big-endian
//! 16-bit channels of raw ADC and status data, 8 one-byte event counters,
//! then the current OCP rail byte. Channel values are raw counts; unit
//! conversion happens on the ground.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::battery::BatteryStatus;
use super::ocp::OcpRailState;
use super::TelemetryError;
use crate::protocol::constants::HK_DATA_LEN;

/// One decoded housekeeping report, fields in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HousekeepingSnapshot {
    pub batt_status: u16,
    pub batt_output_voltage: u16,
    pub batt_current_magnitude: u16,
    pub batt_current_direction: u16,
    pub batt_motherboard_temp: u16,
    pub batt_current_5v: u16,
    pub batt_voltage_5v: u16,
    pub batt_current_3v3: u16,
    pub batt_voltage_3v3: u16,
    pub batt_daughterboard_temp: u16,
    pub batt_daughterboard_heater_status: u16,
    pub eps_temp: u16,
    pub pv_top1_current: u16,
    pub pv_top2_current: u16,
    pub ocp5_current: u16,
    pub ocp6_current: u16,
    pub ocp6_voltage: u16,
    pub ocp4_current: u16,
    pub ocp4_voltage: u16,
    pub ocp5_voltage: u16,
    pub ocp3_current: u16,
    pub ocp3_voltage: u16,
    pub sys_5v_current: u16,
    pub sys_3v3_current: u16,
    pub ocp2_current: u16,
    pub ocp2_voltage: u16,
    pub ocp1_voltage: u16,
    pub pv_north2_current: u16,
    pub pv_north1_current: u16,
    pub charge_current: u16,
    pub pv_west1_current: u16,
    pub mppt_bus_voltage: u16,
    pub mppt2_lower_pv_voltage: u16,
    pub mppt2_mid_pv_voltage: u16,
    pub pv_west2_current: u16,
    pub pv_south2_current: u16,
    pub pv_south1_current: u16,
    pub uvp_5v_voltage: u16,
    pub uvp_3v3_voltage: u16,
    pub vbatt_voltage: u16,
    pub ocp1_current: u16,
    pub pv_east2_current: u16,
    pub pv_east1_current: u16,
    pub mppt1_lower_pv_voltage: u16,
    pub mppt3_lower_pv_voltage: u16,
    pub mppt1_mid_pv_voltage: u16,
    pub mppt3_mid_pv_voltage: u16,
    pub flash_error_count: u16,

    pub ocp1_trip_count: u8,
    pub ocp2_trip_count: u8,
    pub ocp3_trip_count: u8,
    pub ocp4_trip_count: u8,
    pub ocp5_trip_count: u8,
    pub ocp6_trip_count: u8,
    pub reboot_count: u8,
    pub tobc_time_count: u8,

    pub ocp_rail_state: OcpRailState,
}

impl HousekeepingSnapshot {
    /// Serialized length on the wire.
    pub const SIZE: usize = HK_DATA_LEN;

    pub fn from_bytes(data: &[u8]) -> Result<Self, TelemetryError> {
        if data.len() < Self::SIZE {
            return Err(TelemetryError::BufferTooSmall {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        let mut c = Cursor::new(data);
        Ok(Self {
            batt_status: c.read_u16::<BigEndian>()?,
            batt_output_voltage: c.read_u16::<BigEndian>()?,
            batt_current_magnitude: c.read_u16::<BigEndian>()?,
            batt_current_direction: c.read_u16::<BigEndian>()?,
            batt_motherboard_temp: c.read_u16::<BigEndian>()?,
            batt_current_5v: c.read_u16::<BigEndian>()?,
            batt_voltage_5v: c.read_u16::<BigEndian>()?,
            batt_current_3v3: c.read_u16::<BigEndian>()?,
            batt_voltage_3v3: c.read_u16::<BigEndian>()?,
            batt_daughterboard_temp: c.read_u16::<BigEndian>()?,
            batt_daughterboard_heater_status: c.read_u16::<BigEndian>()?,
            eps_temp: c.read_u16::<BigEndian>()?,
            pv_top1_current: c.read_u16::<BigEndian>()?,
            pv_top2_current: c.read_u16::<BigEndian>()?,
            ocp5_current: c.read_u16::<BigEndian>()?,
            ocp6_current: c.read_u16::<BigEndian>()?,
            ocp6_voltage: c.read_u16::<BigEndian>()?,
            ocp4_current: c.read_u16::<BigEndian>()?,
            ocp4_voltage: c.read_u16::<BigEndian>()?,
            ocp5_voltage: c.read_u16::<BigEndian>()?,
            ocp3_current: c.read_u16::<BigEndian>()?,
            ocp3_voltage: c.read_u16::<BigEndian>()?,
            sys_5v_current: c.read_u16::<BigEndian>()?,
            sys_3v3_current: c.read_u16::<BigEndian>()?,
            ocp2_current: c.read_u16::<BigEndian>()?,
            ocp2_voltage: c.read_u16::<BigEndian>()?,
            ocp1_voltage: c.read_u16::<BigEndian>()?,
            pv_north2_current: c.read_u16::<BigEndian>()?,
            pv_north1_current: c.read_u16::<BigEndian>()?,
            charge_current: c.read_u16::<BigEndian>()?,
            pv_west1_current: c.read_u16::<BigEndian>()?,
            mppt_bus_voltage: c.read_u16::<BigEndian>()?,
            mppt2_lower_pv_voltage: c.read_u16::<BigEndian>()?,
            mppt2_mid_pv_voltage: c.read_u16::<BigEndian>()?,
            pv_west2_current: c.read_u16::<BigEndian>()?,
            pv_south2_current: c.read_u16::<BigEndian>()?,
            pv_south1_current: c.read_u16::<BigEndian>()?,
            uvp_5v_voltage: c.read_u16::<BigEndian>()?,
            uvp_3v3_voltage: c.read_u16::<BigEndian>()?,
            vbatt_voltage: c.read_u16::<BigEndian>()?,
            ocp1_current: c.read_u16::<BigEndian>()?,
            pv_east2_current: c.read_u16::<BigEndian>()?,
            pv_east1_current: c.read_u16::<BigEndian>()?,
            mppt1_lower_pv_voltage: c.read_u16::<BigEndian>()?,
            mppt3_lower_pv_voltage: c.read_u16::<BigEndian>()?,
            mppt1_mid_pv_voltage: c.read_u16::<BigEndian>()?,
            mppt3_mid_pv_voltage: c.read_u16::<BigEndian>()?,
            flash_error_count: c.read_u16::<BigEndian>()?,
            ocp1_trip_count: c.read_u8()?,
            ocp2_trip_count: c.read_u8()?,
            ocp3_trip_count: c.read_u8()?,
            ocp4_trip_count: c.read_u8()?,
            ocp5_trip_count: c.read_u8()?,
            ocp6_trip_count: c.read_u8()?,
            reboot_count: c.read_u8()?,
            tobc_time_count: c.read_u8()?,
            ocp_rail_state: OcpRailState::from_byte(c.read_u8()?),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(Self::SIZE);
        b.write_u16::<BigEndian>(self.batt_status).unwrap();
        b.write_u16::<BigEndian>(self.batt_output_voltage).unwrap();
        b.write_u16::<BigEndian>(self.batt_current_magnitude).unwrap();
        b.write_u16::<BigEndian>(self.batt_current_direction).unwrap();
        b.write_u16::<BigEndian>(self.batt_motherboard_temp).unwrap();
        b.write_u16::<BigEndian>(self.batt_current_5v).unwrap();
        b.write_u16::<BigEndian>(self.batt_voltage_5v).unwrap();
        b.write_u16::<BigEndian>(self.batt_current_3v3).unwrap();
        b.write_u16::<BigEndian>(self.batt_voltage_3v3).unwrap();
        b.write_u16::<BigEndian>(self.batt_daughterboard_temp).unwrap();
        b.write_u16::<BigEndian>(self.batt_daughterboard_heater_status)
            .unwrap();
        b.write_u16::<BigEndian>(self.eps_temp).unwrap();
        b.write_u16::<BigEndian>(self.pv_top1_current).unwrap();
        b.write_u16::<BigEndian>(self.pv_top2_current).unwrap();
        b.write_u16::<BigEndian>(self.ocp5_current).unwrap();
        b.write_u16::<BigEndian>(self.ocp6_current).unwrap();
        b.write_u16::<BigEndian>(self.ocp6_voltage).unwrap();
        b.write_u16::<BigEndian>(self.ocp4_current).unwrap();
        b.write_u16::<BigEndian>(self.ocp4_voltage).unwrap();
        b.write_u16::<BigEndian>(self.ocp5_voltage).unwrap();
        b.write_u16::<BigEndian>(self.ocp3_current).unwrap();
        b.write_u16::<BigEndian>(self.ocp3_voltage).unwrap();
        b.write_u16::<BigEndian>(self.sys_5v_current).unwrap();
        b.write_u16::<BigEndian>(self.sys_3v3_current).unwrap();
        b.write_u16::<BigEndian>(self.ocp2_current).unwrap();
        b.write_u16::<BigEndian>(self.ocp2_voltage).unwrap();
        b.write_u16::<BigEndian>(self.ocp1_voltage).unwrap();
        b.write_u16::<BigEndian>(self.pv_north2_current).unwrap();
        b.write_u16::<BigEndian>(self.pv_north1_current).unwrap();
        b.write_u16::<BigEndian>(self.charge_current).unwrap();
        b.write_u16::<BigEndian>(self.pv_west1_current).unwrap();
        b.write_u16::<BigEndian>(self.mppt_bus_voltage).unwrap();
        b.write_u16::<BigEndian>(self.mppt2_lower_pv_voltage).unwrap();
        b.write_u16::<BigEndian>(self.mppt2_mid_pv_voltage).unwrap();
        b.write_u16::<BigEndian>(self.pv_west2_current).unwrap();
        b.write_u16::<BigEndian>(self.pv_south2_current).unwrap();
        b.write_u16::<BigEndian>(self.pv_south1_current).unwrap();
        b.write_u16::<BigEndian>(self.uvp_5v_voltage).unwrap();
        b.write_u16::<BigEndian>(self.uvp_3v3_voltage).unwrap();
        b.write_u16::<BigEndian>(self.vbatt_voltage).unwrap();
        b.write_u16::<BigEndian>(self.ocp1_current).unwrap();
        b.write_u16::<BigEndian>(self.pv_east2_current).unwrap();
        b.write_u16::<BigEndian>(self.pv_east1_current).unwrap();
        b.write_u16::<BigEndian>(self.mppt1_lower_pv_voltage).unwrap();
        b.write_u16::<BigEndian>(self.mppt3_lower_pv_voltage).unwrap();
        b.write_u16::<BigEndian>(self.mppt1_mid_pv_voltage).unwrap();
        b.write_u16::<BigEndian>(self.mppt3_mid_pv_voltage).unwrap();
        b.write_u16::<BigEndian>(self.flash_error_count).unwrap();
        b.push(self.ocp1_trip_count);
        b.push(self.ocp2_trip_count);
        b.push(self.ocp3_trip_count);
        b.push(self.ocp4_trip_count);
        b.push(self.ocp5_trip_count);
        b.push(self.ocp6_trip_count);
        b.push(self.reboot_count);
        b.push(self.tobc_time_count);
        b.push(self.ocp_rail_state.to_byte());
        b
    }

    /// Decoded view of the battery status channel.
    pub fn battery_status(&self) -> BatteryStatus {
        BatteryStatus::from_word(self.batt_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{HK_CHANNEL_COUNT, HK_COUNTER_COUNT};

    fn sample_bytes() -> Vec<u8> {
        let mut data = Vec::with_capacity(HousekeepingSnapshot::SIZE);
        for i in 0..HK_CHANNEL_COUNT as u16 {
            data.extend_from_slice(&(100 + i).to_be_bytes());
        }
        for j in 0..HK_COUNTER_COUNT as u8 {
            data.push(200 + j);
        }
        data.push(0x15);
        data
    }

    #[test]
    fn test_decode_field_positions() {
        let data = sample_bytes();
        assert_eq!(data.len(), HousekeepingSnapshot::SIZE);
        let hk = HousekeepingSnapshot::from_bytes(&data).unwrap();

        assert_eq!(hk.batt_status, 100);
        assert_eq!(hk.batt_output_voltage, 101);
        assert_eq!(hk.eps_temp, 111);
        assert_eq!(hk.mppt_bus_voltage, 131);
        assert_eq!(hk.vbatt_voltage, 139);
        assert_eq!(hk.flash_error_count, 147);

        assert_eq!(hk.ocp1_trip_count, 200);
        assert_eq!(hk.ocp6_trip_count, 205);
        assert_eq!(hk.reboot_count, 206);
        assert_eq!(hk.tobc_time_count, 207);

        assert!(hk.ocp_rail_state.radio_tx);
        assert!(hk.ocp_rail_state.eps_mcu);
        assert!(hk.ocp_rail_state.gnss_rx);
        assert!(!hk.ocp_rail_state.obc);
    }

    #[test]
    fn test_round_trip() {
        let data = sample_bytes();
        let hk = HousekeepingSnapshot::from_bytes(&data).unwrap();
        assert_eq!(hk.to_bytes(), data);
    }

    #[test]
    fn test_too_small() {
        let data = sample_bytes();
        assert!(HousekeepingSnapshot::from_bytes(&data[..data.len() - 1]).is_err());
    }

    #[test]
    fn test_battery_status_channel() {
        let mut hk = HousekeepingSnapshot::default();
        hk.batt_status = 1 << 3;
        assert!(hk.battery_status().oscillator_failure);
        assert!(!hk.battery_status().is_nominal());

        hk.batt_status = 0;
        assert!(hk.battery_status().is_nominal());
    }
}
