pub struct DefaultsConfig {
    pub px: usize,
    pub input_directory: &'static str,
    pub output_directory: &'static str,
    pub scalar: bool,
    pub only_longitudinal: bool,
    pub two_dimensional: bool,
    pub synthetic: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            px: 1,
            input_directory: "in",
            output_directory: "out",
            scalar: false,
            only_longitudinal: false,
            two_dimensional: false,
            synthetic: false,
        }
    }
}
