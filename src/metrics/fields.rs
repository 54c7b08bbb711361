use super::{DeviceLabels, MetricsRegistry};
use crate::prelude::*;
use crate::sunspec::{resolve, AbsentPolicy, InverterModel, MeterModel, RawValue};

/// Where a gauge takes its value from.
pub enum Source<M> {
    /// A value register resolved against its scale factor register.
    Scaled { raw: fn(&M) -> RawValue, sf: fn(&M) -> i16 },
    /// Published as read: identifiers, status codes, the scale factors themselves.
    Raw(fn(&M) -> f64),
}

/// One published gauge and how to derive it from a decoded block.
pub struct Field<M> {
    pub name: &'static str,
    pub help: &'static str,
    pub source: Source<M>,
}

impl<M> Field<M> {
    /// `None` means the reading is absent and the series is not exposed.
    pub fn value(&self, model: &M, policy: AbsentPolicy) -> Option<f64> {
        match &self.source {
            Source::Scaled { raw, sf } => resolve(raw(model), sf(model)).or_policy(policy),
            Source::Raw(read) => Some(read(model)),
        }
    }
}

macro_rules! scaled {
    ($name:literal, $help:literal, $($raw:ident).+, $sf:ident) => {
        Field {
            name: $name,
            help: $help,
            source: Source::Scaled {
                raw: |m| RawValue::from(m $(.$raw)+),
                sf: |m| m.$sf,
            },
        }
    };
}

macro_rules! raw {
    ($name:literal, $help:literal, $field:ident) => {
        Field {
            name: $name,
            help: $help,
            source: Source::Raw(|m| f64::from(m.$field)),
        }
    };
}

/// Writes every field of `table` for `model`. Meter tables are published
/// with their slot prefix.
pub fn publish<M>(
    metrics: &MetricsRegistry,
    prefix: &str,
    table: &[Field<M>],
    model: &M,
    labels: &DeviceLabels,
    policy: AbsentPolicy,
) -> Result<()> {
    for field in table {
        let name = format!("{}{}", prefix, field.name);
        match field.value(model, policy) {
            Some(value) => metrics.set_gauge(&name, labels, value)?,
            // not implemented this cycle, stop exposing the last value
            None => metrics.remove_gauge(&name, labels)?,
        }
    }

    Ok(())
}

pub static INVERTER_FIELDS: &[Field<InverterModel>] = &[
    raw!("SunSpec_DID", "101 = single phase 102 = split phase 103 = three phase", did),
    raw!("SunSpec_Length", "Registers 50 = Length of model block", length),
    scaled!("AC_Current", "Amps AC Total Current value", ac_current, ac_current_sf),
    scaled!("AC_CurrentA", "Amps AC Phase A Current value", ac_current_a, ac_current_sf),
    scaled!("AC_CurrentB", "Amps AC Phase B Current value", ac_current_b, ac_current_sf),
    scaled!("AC_CurrentC", "Amps AC Phase C Current value", ac_current_c, ac_current_sf),
    raw!("AC_Current_SF", "AC Current scale factor", ac_current_sf),
    scaled!("AC_VoltageAB", "Volts AC Voltage Phase AB value", ac_voltage_ab, ac_voltage_sf),
    scaled!("AC_VoltageBC", "Volts AC Voltage Phase BC value", ac_voltage_bc, ac_voltage_sf),
    scaled!("AC_VoltageCA", "Volts AC Voltage Phase CA value", ac_voltage_ca, ac_voltage_sf),
    scaled!("AC_VoltageAN", "Volts AC Voltage Phase A to N value", ac_voltage_an, ac_voltage_sf),
    scaled!("AC_VoltageBN", "Volts AC Voltage Phase B to N value", ac_voltage_bn, ac_voltage_sf),
    scaled!("AC_VoltageCN", "Volts AC Voltage Phase C to N value", ac_voltage_cn, ac_voltage_sf),
    raw!("AC_Voltage_SF", "AC Voltage scale factor", ac_voltage_sf),
    scaled!("AC_Power", "Watts AC Power value", ac_power, ac_power_sf),
    raw!("AC_Power_SF", "AC Power scale factor", ac_power_sf),
    scaled!("AC_Frequency", "Hertz AC Frequency value", ac_frequency, ac_frequency_sf),
    raw!("AC_Frequency_SF", "AC Frequency scale factor", ac_frequency_sf),
    scaled!("AC_VA", "VA Apparent Power", ac_va, ac_va_sf),
    raw!("AC_VA_SF", "AC Apparent Power scale factor", ac_va_sf),
    scaled!("AC_VAR", "VAR Reactive Power", ac_var, ac_var_sf),
    raw!("AC_VAR_SF", "AC Reactive Power scale factor", ac_var_sf),
    scaled!("AC_PF", "% Power Factor", ac_pf, ac_pf_sf),
    raw!("AC_PF_SF", "AC Power Factor scale factor", ac_pf_sf),
    scaled!("AC_Energy_WH", "WattHours AC Lifetime Energy production", ac_energy_wh, ac_energy_wh_sf),
    raw!("AC_Energy_WH_SF", "AC Lifetime Energy scale factor", ac_energy_wh_sf),
    scaled!("DC_Current", "Amps DC Current value", dc_current, dc_current_sf),
    raw!("DC_Current_SF", "DC Current scale factor", dc_current_sf),
    scaled!("DC_Voltage", "Volts DC Voltage value", dc_voltage, dc_voltage_sf),
    raw!("DC_Voltage_SF", "DC Voltage scale factor", dc_voltage_sf),
    scaled!("DC_Power", "Watts DC Power value", dc_power, dc_power_sf),
    raw!("DC_Power_SF", "DC Power scale factor", dc_power_sf),
    scaled!("Temp_Sink", "Degrees C Heat Sink Temperature", temp_sink, temp_sf),
    raw!("Temp_SF", "Temperature scale factor", temp_sf),
    raw!("Status", "Operating State", status),
    raw!(
        "Status_Vendor",
        "Vendor-defined operating state and error codes. For error description, meaning and troubleshooting, refer to the SolarEdge Installation Guide.",
        status_vendor
    ),
];

/// Meter gauges, without the `M_`/`M2_` slot prefix.
pub static METER_FIELDS: &[Field<MeterModel>] = &[
    raw!("SunSpec_DID", "201 = single phase 202 = split phase 203 = wye three phase 204 = delta three phase", did),
    raw!("SunSpec_Length", "Registers 105 = Length of model block", length),
    scaled!("AC_Current", "Amps AC Total Current value", current.total, current_sf),
    scaled!("AC_CurrentA", "Amps AC Phase A Current value", current.a, current_sf),
    scaled!("AC_CurrentB", "Amps AC Phase B Current value", current.b, current_sf),
    scaled!("AC_CurrentC", "Amps AC Phase C Current value", current.c, current_sf),
    raw!("AC_Current_SF", "AC Current scale factor", current_sf),
    scaled!("AC_VoltageLN", "Volts AC Voltage Line to Neutral average", voltage_ln.total, voltage_sf),
    scaled!("AC_VoltageAN", "Volts AC Voltage Phase A to N value", voltage_ln.a, voltage_sf),
    scaled!("AC_VoltageBN", "Volts AC Voltage Phase B to N value", voltage_ln.b, voltage_sf),
    scaled!("AC_VoltageCN", "Volts AC Voltage Phase C to N value", voltage_ln.c, voltage_sf),
    scaled!("AC_VoltageLL", "Volts AC Voltage Line to Line average", voltage_ll.total, voltage_sf),
    scaled!("AC_VoltageAB", "Volts AC Voltage Phase AB value", voltage_ll.a, voltage_sf),
    scaled!("AC_VoltageBC", "Volts AC Voltage Phase BC value", voltage_ll.b, voltage_sf),
    scaled!("AC_VoltageCA", "Volts AC Voltage Phase CA value", voltage_ll.c, voltage_sf),
    raw!("AC_Voltage_SF", "AC Voltage scale factor", voltage_sf),
    scaled!("AC_Frequency", "Hertz AC Frequency value", frequency, frequency_sf),
    raw!("AC_Frequency_SF", "AC Frequency scale factor", frequency_sf),
    scaled!("AC_Power", "Watts AC Total Real Power value", power.total, power_sf),
    scaled!("AC_Power_A", "Watts AC Phase A Real Power value", power.a, power_sf),
    scaled!("AC_Power_B", "Watts AC Phase B Real Power value", power.b, power_sf),
    scaled!("AC_Power_C", "Watts AC Phase C Real Power value", power.c, power_sf),
    raw!("AC_Power_SF", "AC Real Power scale factor", power_sf),
    scaled!("AC_VA", "VA Total Apparent Power", va.total, va_sf),
    scaled!("AC_VA_A", "VA Phase A Apparent Power", va.a, va_sf),
    scaled!("AC_VA_B", "VA Phase B Apparent Power", va.b, va_sf),
    scaled!("AC_VA_C", "VA Phase C Apparent Power", va.c, va_sf),
    raw!("AC_VA_SF", "AC Apparent Power scale factor", va_sf),
    scaled!("AC_VAR", "VAR Total Reactive Power", var.total, var_sf),
    scaled!("AC_VAR_A", "VAR Phase A Reactive Power", var.a, var_sf),
    scaled!("AC_VAR_B", "VAR Phase B Reactive Power", var.b, var_sf),
    scaled!("AC_VAR_C", "VAR Phase C Reactive Power", var.c, var_sf),
    raw!("AC_VAR_SF", "AC Reactive Power scale factor", var_sf),
    scaled!("AC_PF", "% Average Power Factor", pf.total, pf_sf),
    scaled!("AC_PF_A", "% Phase A Power Factor", pf.a, pf_sf),
    scaled!("AC_PF_B", "% Phase B Power Factor", pf.b, pf_sf),
    scaled!("AC_PF_C", "% Phase C Power Factor", pf.c, pf_sf),
    raw!("AC_PF_SF", "AC Power Factor scale factor", pf_sf),
    scaled!("Exported", "WattHours AC Total Exported", exported.total, energy_w_sf),
    scaled!("Exported_A", "WattHours AC Phase A Exported", exported.a, energy_w_sf),
    scaled!("Exported_B", "WattHours AC Phase B Exported", exported.b, energy_w_sf),
    scaled!("Exported_C", "WattHours AC Phase C Exported", exported.c, energy_w_sf),
    scaled!("Imported", "WattHours AC Total Imported", imported.total, energy_w_sf),
    scaled!("Imported_A", "WattHours AC Phase A Imported", imported.a, energy_w_sf),
    scaled!("Imported_B", "WattHours AC Phase B Imported", imported.b, energy_w_sf),
    scaled!("Imported_C", "WattHours AC Phase C Imported", imported.c, energy_w_sf),
    raw!("Energy_W_SF", "Real Energy scale factor", energy_w_sf),
    scaled!("Exported_VA", "VA-hours AC Total Exported", exported_va.total, energy_va_sf),
    scaled!("Exported_VA_A", "VA-hours AC Phase A Exported", exported_va.a, energy_va_sf),
    scaled!("Exported_VA_B", "VA-hours AC Phase B Exported", exported_va.b, energy_va_sf),
    scaled!("Exported_VA_C", "VA-hours AC Phase C Exported", exported_va.c, energy_va_sf),
    scaled!("Imported_VA", "VA-hours AC Total Imported", imported_va.total, energy_va_sf),
    scaled!("Imported_VA_A", "VA-hours AC Phase A Imported", imported_va.a, energy_va_sf),
    scaled!("Imported_VA_B", "VA-hours AC Phase B Imported", imported_va.b, energy_va_sf),
    scaled!("Imported_VA_C", "VA-hours AC Phase C Imported", imported_va.c, energy_va_sf),
    raw!("Energy_VA_SF", "Apparent Energy scale factor", energy_va_sf),
    scaled!("Import_VARh_Q1", "VAR-hours Total Imported Quadrant 1", import_varh_q1.total, energy_var_sf),
    scaled!("Import_VARh_Q1_A", "VAR-hours Phase A Imported Quadrant 1", import_varh_q1.a, energy_var_sf),
    scaled!("Import_VARh_Q1_B", "VAR-hours Phase B Imported Quadrant 1", import_varh_q1.b, energy_var_sf),
    scaled!("Import_VARh_Q1_C", "VAR-hours Phase C Imported Quadrant 1", import_varh_q1.c, energy_var_sf),
    scaled!("Import_VARh_Q2", "VAR-hours Total Imported Quadrant 2", import_varh_q2.total, energy_var_sf),
    scaled!("Import_VARh_Q2_A", "VAR-hours Phase A Imported Quadrant 2", import_varh_q2.a, energy_var_sf),
    scaled!("Import_VARh_Q2_B", "VAR-hours Phase B Imported Quadrant 2", import_varh_q2.b, energy_var_sf),
    scaled!("Import_VARh_Q2_C", "VAR-hours Phase C Imported Quadrant 2", import_varh_q2.c, energy_var_sf),
    scaled!("Export_VARh_Q3", "VAR-hours Total Exported Quadrant 3", export_varh_q3.total, energy_var_sf),
    scaled!("Export_VARh_Q3_A", "VAR-hours Phase A Exported Quadrant 3", export_varh_q3.a, energy_var_sf),
    scaled!("Export_VARh_Q3_B", "VAR-hours Phase B Exported Quadrant 3", export_varh_q3.b, energy_var_sf),
    scaled!("Export_VARh_Q3_C", "VAR-hours Phase C Exported Quadrant 3", export_varh_q3.c, energy_var_sf),
    scaled!("Export_VARh_Q4", "VAR-hours Total Exported Quadrant 4", export_varh_q4.total, energy_var_sf),
    scaled!("Export_VARh_Q4_A", "VAR-hours Phase A Exported Quadrant 4", export_varh_q4.a, energy_var_sf),
    scaled!("Export_VARh_Q4_B", "VAR-hours Phase B Exported Quadrant 4", export_varh_q4.b, energy_var_sf),
    scaled!("Export_VARh_Q4_C", "VAR-hours Phase C Exported Quadrant 4", export_varh_q4.c, energy_var_sf),
    raw!("Energy_VAR_SF", "Reactive Energy scale factor", energy_var_sf),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn unique<M>(table: &[Field<M>]) -> bool {
        let mut seen = HashSet::new();
        table.iter().all(|f| seen.insert(f.name))
    }

    #[test]
    fn names_are_unique() {
        assert!(unique(INVERTER_FIELDS));
        assert!(unique(METER_FIELDS));
    }

    #[test]
    fn every_field_has_help() {
        assert!(INVERTER_FIELDS.iter().all(|f| !f.help.is_empty()));
        assert!(METER_FIELDS.iter().all(|f| !f.help.is_empty()));
    }

    #[test]
    fn inverter_table_covers_published_names() {
        let names: HashSet<_> = INVERTER_FIELDS.iter().map(|f| f.name).collect();
        for name in [
            "SunSpec_DID",
            "SunSpec_Length",
            "AC_Current",
            "AC_CurrentA",
            "AC_CurrentB",
            "AC_CurrentC",
            "AC_Current_SF",
            "AC_VoltageAB",
            "AC_VoltageBC",
            "AC_VoltageCA",
            "AC_VoltageAN",
            "AC_VoltageBN",
            "AC_VoltageCN",
            "AC_Voltage_SF",
            "AC_Power",
            "AC_Power_SF",
            "AC_Frequency",
            "AC_Frequency_SF",
            "AC_VA",
            "AC_VA_SF",
            "AC_VAR",
            "AC_VAR_SF",
            "AC_PF",
            "AC_PF_SF",
            "AC_Energy_WH",
            "AC_Energy_WH_SF",
            "DC_Current",
            "DC_Current_SF",
            "DC_Voltage",
            "DC_Voltage_SF",
            "DC_Power",
            "DC_Power_SF",
            "Temp_Sink",
            "Temp_SF",
            "Status",
            "Status_Vendor",
        ] {
            assert!(names.contains(name), "missing {}", name);
        }
        assert_eq!(names.len(), 36);
    }

    #[test]
    fn meter_table_covers_published_names() {
        let names: HashSet<_> = METER_FIELDS.iter().map(|f| f.name).collect();
        for name in [
            "SunSpec_DID",
            "AC_Current",
            "AC_VoltageLN",
            "AC_VoltageLL",
            "AC_Power_C",
            "AC_VA_SF",
            "AC_PF_A",
            "Exported",
            "Exported_C",
            "Imported",
            "Imported_A",
            "Energy_W_SF",
            "Import_VARh_Q1",
            "Export_VARh_Q4_C",
            "Energy_VAR_SF",
        ] {
            assert!(names.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn scaled_value_applies_policy() {
        let mut model = InverterModel {
            ac_power: 2500,
            ac_power_sf: -1,
            ..Default::default()
        };
        let field = INVERTER_FIELDS.iter().find(|f| f.name == "AC_Power").unwrap();
        assert_eq!(field.value(&model, AbsentPolicy::Omit), Some(250.0));

        model.ac_power = i16::MIN;
        assert_eq!(field.value(&model, AbsentPolicy::Omit), None);
        assert_eq!(field.value(&model, AbsentPolicy::Zero), Some(0.0));
    }

    #[test]
    fn scale_factor_gauges_publish_the_exponent() {
        let model = InverterModel {
            ac_power_sf: -2,
            ..Default::default()
        };
        let field = INVERTER_FIELDS.iter().find(|f| f.name == "AC_Power_SF").unwrap();
        assert_eq!(field.value(&model, AbsentPolicy::Omit), Some(-2.0));
    }

    #[test]
    fn absent_reading_removes_the_previous_value() {
        let metrics = MetricsRegistry::new().unwrap();
        let labels = DeviceLabels::new("S1", "M", "V");
        let mut model = InverterModel {
            dc_power: 4400,
            ..Default::default()
        };

        publish(&metrics, "", INVERTER_FIELDS, &model, &labels, AbsentPolicy::Omit).unwrap();
        assert_eq!(metrics.value("DC_Power", &labels), Some(4400.0));

        model.dc_power = i16::MIN;
        publish(&metrics, "", INVERTER_FIELDS, &model, &labels, AbsentPolicy::Omit).unwrap();
        assert_eq!(metrics.value("DC_Power", &labels), None);
        assert_eq!(metrics.value("DC_Power_SF", &labels), Some(0.0));

        // zero policy keeps the series with a value
        publish(&metrics, "", INVERTER_FIELDS, &model, &labels, AbsentPolicy::Zero).unwrap();
        assert_eq!(metrics.value("DC_Power", &labels), Some(0.0));
    }

    #[test]
    fn publish_prefixes_meter_names() {
        let metrics = MetricsRegistry::new().unwrap();
        let labels = DeviceLabels::new("S1", "M", "V");
        let model = MeterModel {
            did: 203,
            length: 105,
            ..Default::default()
        };

        publish(&metrics, "M2_", METER_FIELDS, &model, &labels, AbsentPolicy::Omit).unwrap();

        assert_eq!(metrics.value("M2_SunSpec_DID", &labels), Some(203.0));
        assert_eq!(metrics.value("M_SunSpec_DID", &labels), None);
        assert_eq!(metrics.value("M2_Exported", &labels), Some(0.0));
    }
}
