//! Manufacturing processes and materials

use serde::{Deserialize, Serialize};

/// Manufacturing process a part is evaluated against
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Process {
    #[default]
    InjectionMolding,
    CncMilling,
    CncTurning,
    FdmPrinting,
    SlaPrinting,
    SlsPrinting,
    SheetMetal,
    Casting,
    Forging,
    Extrusion,
}

/// Broad grouping used to select process-specific checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFamily {
    Molding,
    Machining,
    Additive,
    Forming,
}

impl Process {
    pub const ALL: [Process; 10] = [
        Process::InjectionMolding,
        Process::CncMilling,
        Process::CncTurning,
        Process::FdmPrinting,
        Process::SlaPrinting,
        Process::SlsPrinting,
        Process::SheetMetal,
        Process::Casting,
        Process::Forging,
        Process::Extrusion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Process::InjectionMolding => "injection_molding",
            Process::CncMilling => "cnc_milling",
            Process::CncTurning => "cnc_turning",
            Process::FdmPrinting => "fdm_printing",
            Process::SlaPrinting => "sla_printing",
            Process::SlsPrinting => "sls_printing",
            Process::SheetMetal => "sheet_metal",
            Process::Casting => "casting",
            Process::Forging => "forging",
            Process::Extrusion => "extrusion",
        }
    }

    /// Human-readable name for reports
    pub fn label(&self) -> &'static str {
        match self {
            Process::InjectionMolding => "Injection Molding",
            Process::CncMilling => "CNC Milling",
            Process::CncTurning => "CNC Turning",
            Process::FdmPrinting => "FDM 3D Printing",
            Process::SlaPrinting => "SLA 3D Printing",
            Process::SlsPrinting => "SLS 3D Printing",
            Process::SheetMetal => "Sheet Metal",
            Process::Casting => "Casting",
            Process::Forging => "Forging",
            Process::Extrusion => "Extrusion",
        }
    }

    pub fn family(&self) -> ProcessFamily {
        match self {
            Process::InjectionMolding | Process::Casting => ProcessFamily::Molding,
            Process::CncMilling | Process::CncTurning => ProcessFamily::Machining,
            Process::FdmPrinting | Process::SlaPrinting | Process::SlsPrinting => {
                ProcessFamily::Additive
            }
            Process::SheetMetal | Process::Forging | Process::Extrusion => ProcessFamily::Forming,
        }
    }

    /// Fixed advantages listed in process recommendations
    pub fn advantages(&self) -> &'static [&'static str] {
        match self {
            Process::InjectionMolding => &[
                "Low unit cost at high volumes",
                "Excellent surface finish",
                "High repeatability",
                "Wide material selection",
            ],
            Process::CncMilling | Process::CncTurning => &[
                "High precision and tight tolerances",
                "No tooling investment",
                "Suitable for metals and engineering plastics",
                "Fast turnaround for low volumes",
            ],
            Process::FdmPrinting | Process::SlaPrinting | Process::SlsPrinting => &[
                "No tooling required",
                "Rapid prototyping",
                "Complex internal geometries possible",
                "Low cost for one-off parts",
            ],
            Process::SheetMetal => &[
                "Low cost for thin enclosures",
                "Fast fabrication",
                "Strong bent features",
            ],
            Process::Casting => &[
                "Complex shapes in metal",
                "Economical at medium volumes",
                "Large parts possible",
            ],
            Process::Forging => &[
                "Superior mechanical strength",
                "Refined grain structure",
                "Good for load-bearing parts",
            ],
            Process::Extrusion => &[
                "Constant cross-sections at low cost",
                "Long continuous lengths",
                "Minimal material waste",
            ],
        }
    }

    /// Fixed limitations listed in process recommendations
    pub fn limitations(&self) -> &'static [&'static str] {
        match self {
            Process::InjectionMolding => &[
                "High initial tooling cost",
                "Long lead time for molds",
                "Design changes are expensive",
                "Requires draft angles",
            ],
            Process::CncMilling | Process::CncTurning => &[
                "Higher unit cost at volume",
                "Material waste from subtractive process",
                "Internal corners limited by tool radius",
                "Deep pockets are difficult",
            ],
            Process::FdmPrinting | Process::SlaPrinting | Process::SlsPrinting => &[
                "Visible layer lines",
                "Anisotropic strength",
                "Slow for large volumes",
                "Limited material properties",
            ],
            Process::SheetMetal => &[
                "Uniform thickness only",
                "Bend radius constraints",
                "Limited to open geometries",
            ],
            Process::Casting => &[
                "Porosity risk",
                "Secondary machining often needed",
                "Pattern or die cost",
            ],
            Process::Forging => &[
                "Expensive dies",
                "Limited geometric complexity",
                "Secondary machining needed",
            ],
            Process::Extrusion => &[
                "Only constant profiles",
                "Die cost per profile",
                "Length tolerances need cutting",
            ],
        }
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Process {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "injection_molding" | "injection_moulding" | "im" | "molding" => {
                Ok(Process::InjectionMolding)
            }
            "cnc_milling" | "cnc_machining" | "cnc" | "milling" => Ok(Process::CncMilling),
            "cnc_turning" | "turning" | "lathe" => Ok(Process::CncTurning),
            "fdm_printing" | "fdm" | "3d_printing" | "fdm_3d_printing" => Ok(Process::FdmPrinting),
            "sla_printing" | "sla" => Ok(Process::SlaPrinting),
            "sls_printing" | "sls" => Ok(Process::SlsPrinting),
            "sheet_metal" | "sheetmetal" => Ok(Process::SheetMetal),
            "casting" | "die_casting" => Ok(Process::Casting),
            "forging" => Ok(Process::Forging),
            "extrusion" => Ok(Process::Extrusion),
            _ => Err(format!(
                "Invalid process: {}. Use one of: {}",
                s,
                Process::ALL
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

impl TryFrom<String> for Process {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Part material
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Material {
    #[default]
    Abs,
    Pla,
    Petg,
    Nylon,
    Polycarbonate,
    Pom,
    Peek,
    Aluminum,
    Steel,
    StainlessSteel,
    Titanium,
    Copper,
    Brass,
    CarbonFiber,
    GlassFiber,
}

impl Material {
    pub const ALL: [Material; 15] = [
        Material::Abs,
        Material::Pla,
        Material::Petg,
        Material::Nylon,
        Material::Polycarbonate,
        Material::Pom,
        Material::Peek,
        Material::Aluminum,
        Material::Steel,
        Material::StainlessSteel,
        Material::Titanium,
        Material::Copper,
        Material::Brass,
        Material::CarbonFiber,
        Material::GlassFiber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Abs => "abs",
            Material::Pla => "pla",
            Material::Petg => "petg",
            Material::Nylon => "nylon",
            Material::Polycarbonate => "polycarbonate",
            Material::Pom => "pom",
            Material::Peek => "peek",
            Material::Aluminum => "aluminum",
            Material::Steel => "steel",
            Material::StainlessSteel => "stainless_steel",
            Material::Titanium => "titanium",
            Material::Copper => "copper",
            Material::Brass => "brass",
            Material::CarbonFiber => "carbon_fiber",
            Material::GlassFiber => "glass_fiber",
        }
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Material {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "abs" => Ok(Material::Abs),
            "pla" => Ok(Material::Pla),
            "petg" => Ok(Material::Petg),
            "nylon" | "pa" | "pa6" | "pa12" => Ok(Material::Nylon),
            "polycarbonate" | "pc" => Ok(Material::Polycarbonate),
            "pom" | "acetal" | "delrin" => Ok(Material::Pom),
            "peek" => Ok(Material::Peek),
            "aluminum" | "aluminium" | "al" => Ok(Material::Aluminum),
            "steel" | "mild_steel" => Ok(Material::Steel),
            "stainless_steel" | "stainless" | "ss" => Ok(Material::StainlessSteel),
            "titanium" | "ti" => Ok(Material::Titanium),
            "copper" | "cu" => Ok(Material::Copper),
            "brass" => Ok(Material::Brass),
            "carbon_fiber" | "carbon_fibre" | "cf" => Ok(Material::CarbonFiber),
            "glass_fiber" | "glass_fibre" | "gf" => Ok(Material::GlassFiber),
            _ => Err(format!(
                "Invalid material: {}. Use one of: {}",
                s,
                Material::ALL
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

impl TryFrom<String> for Material {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
