use std::num::ParseIntError;

use duolog::{Message, Registration, router_config, wrap_config};

struct Basket {
    discount: u32,
}

impl Basket {
    fn total(&self, quantities: &[&str]) -> Result<u32, ParseIntError> {
        let mut total = 0;
        for quantity in quantities {
            total += quantity.parse::<u32>()? * 10;
        }
        Ok(total.saturating_sub(self.discount))
    }
}

fn main() {
    let guard = router_config()
        .with_app_name("shop")
        .with_extra("region", "eu")
        .with_log_dir("/tmp/duolog_example")
        .unwrap()
        .init_global();

    // developer and public sinks may share an identifier
    duolog::register(Registration::new().with_identifier("orders")).unwrap();
    duolog::register(
        Registration::new()
            .with_identifier("orders")
            .public()
            .with_format("{time} {level} {message}"),
    )
    .unwrap();

    duolog::info("service started").unwrap();
    duolog::warning(Message::new("inventory cache stale for 30s").with_public("Stock levels may be out of date"))
        .unwrap();
    log::info!("messages from the log facade reach the developer sinks");

    let total = wrap_config()
        .with_client_message("Computing your basket")
        .with_success_message("Basket computed")
        .with_error_message("We could not compute your basket")
        .non_fatal(0)
        .attach(Basket::total);
    let basket = Basket { discount: 5 };
    let bound = total.bind(&basket);
    log::info!("total: {}", bound.call(&["1", "2"][..]).unwrap());
    log::info!("total: {}", bound.call(&["1", "two"][..]).unwrap());

    drop(guard);
    for file in ["developer_orders.log", "orders.log"] {
        println!(
            "last line of /tmp/duolog_example/{file} is:\n\t{}",
            std::fs::read_to_string(format!("/tmp/duolog_example/{file}"))
                .unwrap()
                .trim_end()
                .lines()
                .last()
                .unwrap()
        );
    }
}
