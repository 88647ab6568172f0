//! Questions and status messages shown to the user

pub const WRITE_MAIN_FIELD: &str = "would you like to set the main field?";
pub const WRITE_MODULE_FIELD: &str = "would you like to set the module field?";
pub const FIX_MODULE_FIELD: &str = "would you like to fix the module field?";
pub const FIX_UMD_BUILD: &str = "would you like to fix the umd:main field?";
pub const FIX_BROWSER_FIELD: &str = "would you like to fix the browser build?";
pub const ADD_BROWSER_FIELD: &str =
    "would you like to add a browser build? It will add a browser field to your package.json";
pub const BUILD_WORKSPACE_PACKAGES: &str =
    "a workspaces field was found in the root package.json, would you like to build the packages it lists?";
pub const UMD_NAME: &str = "what should the umdName of this package be?";

pub const INITIALISED_PROJECT: &str = "initialised project!";
pub const PROJECT_VALID: &str = "project is valid!";
pub const PROJECT_ALREADY_VALID: &str = "project already valid!";
pub const PROJECT_FIXED: &str = "fixed project!";
pub const BUILDING_BUNDLES: &str = "building bundles!";
pub const BUILT_BUNDLES: &str = "built bundles!";

/// Question asked when a dependency has no UMD global name
pub fn global_name_question(dependency: &str) -> String {
    format!("What should the umdName of {} be?", dependency)
}

/// Line reported for a field that holds its canonical value
pub fn field_valid(field: &str) -> String {
    format!("{} field is valid", field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_name_question() {
        assert_eq!(
            global_name_question("react-dom"),
            "What should the umdName of react-dom be?"
        );
    }
}
