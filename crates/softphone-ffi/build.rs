fn main() {
    uniffi::generate_scaffolding("src/softphone.udl").unwrap();
}
