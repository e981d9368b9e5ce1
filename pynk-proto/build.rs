fn main() {
    tonic_build::configure()
        .compile_protos(
            &[
                "proto/menu.proto",
                "proto/orders.proto",
                "proto/users.proto",
                "proto/auth.proto",
            ],
            &["proto"],
        )
        .unwrap_or_else(|e| panic!("Failed to compile protos {:?}", e));
}
