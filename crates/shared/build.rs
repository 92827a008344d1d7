fn main() {
    println!("cargo:rerun-if-changed=schemas/conference.graphql");
    cynic_codegen::register_schema("conference")
        .from_sdl_file("schemas/conference.graphql")
        .expect("conference schema is readable")
        .as_default()
        .expect("conference schema is valid");
}
