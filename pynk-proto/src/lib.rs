pub mod menu_service {
    tonic::include_proto!("pynk.menu_service");
}

pub mod order_service {
    tonic::include_proto!("pynk.order_service");
}

pub mod user_service {
    tonic::include_proto!("pynk.user_service");
}

pub mod auth_service {
    tonic::include_proto!("pynk.auth_service");
}
