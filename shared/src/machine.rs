//! Static machine descriptor built from the controller INI

use serde::Serialize;

use crate::ini::MachineIni;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisInfo {
    pub number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineDescriptor {
    pub machine_name: String,
    pub default_velocity: Option<String>,
    pub max_linear_velocity: Option<String>,
    pub axis_num: usize,
    pub axis_info: Vec<AxisInfo>,
}

impl MachineDescriptor {
    pub fn from_ini(ini: &MachineIni) -> Self {
        let axis_num = ini
            .find("TRAJ", "AXES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        let axis_info = (0..axis_num)
            .map(|number| {
                let section = format!("AXIS_{}", number);
                let param = |key: &str| ini.find(&section, key).map(str::to_string);
                AxisInfo {
                    number,
                    max_limit: param("MAX_LIMIT"),
                    min_limit: param("MIN_LIMIT"),
                    home_offset: param("HOME_OFFSET"),
                }
            })
            .collect();

        Self {
            machine_name: ini.find("EMC", "MACHINE").unwrap_or("unknown").to_string(),
            default_velocity: ini.find("TRAJ", "DEFAULT_VELOCITY").map(str::to_string),
            max_linear_velocity: ini.find("TRAJ", "MAX_LINEAR_VELOCITY").map(str::to_string),
            axis_num,
            axis_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_ini() {
        let ini = MachineIni::parse(
            "[EMC]\nMACHINE = router\n[TRAJ]\nAXES = 2\nDEFAULT_VELOCITY = 12\n\
             [AXIS_0]\nMAX_LIMIT = 400\nMIN_LIMIT = -1\n[AXIS_1]\nHOME_OFFSET = 5\n",
        );
        let desc = MachineDescriptor::from_ini(&ini);
        assert_eq!(desc.machine_name, "router");
        assert_eq!(desc.axis_num, 2);
        assert_eq!(desc.default_velocity.as_deref(), Some("12"));
        assert_eq!(desc.max_linear_velocity, None);
        assert_eq!(desc.axis_info[0].max_limit.as_deref(), Some("400"));
        assert_eq!(desc.axis_info[1].home_offset.as_deref(), Some("5"));
        assert_eq!(desc.axis_info[1].min_limit, None);
    }

    #[test]
    fn test_descriptor_without_axes() {
        let desc = MachineDescriptor::from_ini(&MachineIni::parse("[TRAJ]\nAXES = many\n"));
        assert_eq!(desc.machine_name, "unknown");
        assert_eq!(desc.axis_num, 0);
        assert!(desc.axis_info.is_empty());
    }
}
