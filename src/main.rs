//! OnionController - Main entry point
//!
//! 1. Load the keymap from NVS (provision on first boot)
//! 2. Spawn the scan task (mux/ADC sweep → HID reports)
//! 3. Spawn the comms task (protocol on UART0)
//! 4. Drain logs to UART1 forever

#[cfg(target_os = "espidf")]
fn main() -> Result<(), esp_idf_svc::sys::EspError> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("{}: firmware runs on ESP-IDF targets only", env!("VERSION_STRING"));
}

#[cfg(target_os = "espidf")]
mod firmware {
    use core::fmt;

    use esp_idf_svc::hal::adc::attenuation::DB_11;
    use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
    use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
    use esp_idf_svc::hal::adc::ADC1;
    use esp_idf_svc::hal::delay::{Ets, FreeRtos, NON_BLOCK};
    use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Gpio34, Output, OutputPin, PinDriver};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::task::thread::ThreadSpawnConfiguration;
    use esp_idf_svc::hal::uart::{self, UartDriver};
    use esp_idf_svc::hal::units::Hertz;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::EspError;

    use onion_controller::config::board::{
        BoardConfig, COMMS_INTERVAL_MS, COMMS_TASK_PRIORITY, SCAN_TASK_PRIORITY, TASK_STACK_SIZE,
    };
    use onion_controller::config::nvs::EspBlobStore;
    use onion_controller::hal::adc::EspAnalogInput;
    use onion_controller::hal::{uptime_us, Mux};
    use onion_controller::hid::{LinkedTransport, APPEARANCE_KEYBOARD, DEVICE_NAME, REPORT_MAP};
    use onion_controller::uart_logger::{init_uart_logger, uart_logger_task, UartLoggerConfig};
    use onion_controller::{
        rt_debug, rt_error, rt_info, ChannelSampler, ControllerState, HidLink, HidTransport,
        KeyboardReport, KeymapStore, ProtocolHandler, ScanConfig, ScanScheduler, TouchScanner,
        COMMS_LOG_STREAM, SCAN_LOG_STREAM,
    };

    /// Version string (set by build.rs, includes git hash)
    const VERSION: &str = env!("VERSION_STRING");

    static STATE: ControllerState = ControllerState::new();
    /// Host link, driven by the wireless stack's connection events.
    static HID_LINK: HidLink = HidLink::new();

    type MuxPin = PinDriver<'static, AnyOutputPin, Output>;

    pub fn run() -> Result<(), EspError> {
        esp_idf_svc::sys::link_patches();

        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;
        let board = BoardConfig::default();

        let log_config = UartLoggerConfig::default();
        let mut log_uart = init_uart_logger(peripherals.uart1, pins.gpio17, &log_config)?;
        rt_info!(COMMS_LOG_STREAM, uptime_us(), "{} starting", VERSION);
        rt_info!(
            COMMS_LOG_STREAM,
            uptime_us(),
            "mux GPIO{:?}, ADC1 ch{}, protocol {} baud",
            board.mux_pins,
            board.adc_channel,
            board.protocol_baud
        );
        rt_info!(
            COMMS_LOG_STREAM,
            uptime_us(),
            "HID '{}' appearance 0x{:04X}, report map {} bytes",
            DEVICE_NAME,
            APPEARANCE_KEYBOARD,
            REPORT_MAP.len()
        );

        let mut store = KeymapStore::new(EspBlobStore::new(EspDefaultNvsPartition::take()?));
        match store.load(&STATE.keymap) {
            Ok(result) => rt_info!(COMMS_LOG_STREAM, uptime_us(), "Keymap: {:?}", result),
            Err(e) => STATE.faults.set(e.fault_code(), e.fault_data()),
        }

        let mux_pins: [MuxPin; 4] = [
            PinDriver::output(pins.gpio18.downgrade_output())?,
            PinDriver::output(pins.gpio19.downgrade_output())?,
            PinDriver::output(pins.gpio21.downgrade_output())?,
            PinDriver::output(pins.gpio22.downgrade_output())?,
        ];
        let adc1 = peripherals.adc1;
        let adc_pin = pins.gpio34;

        ThreadSpawnConfiguration {
            name: Some(b"scan\0"),
            stack_size: TASK_STACK_SIZE,
            priority: SCAN_TASK_PRIORITY,
            ..Default::default()
        }
        .set()?;
        let scan = std::thread::Builder::new()
            .stack_size(TASK_STACK_SIZE)
            .spawn(move || {
                if let Err(e) = scan_task(mux_pins, adc1, adc_pin) {
                    rt_error!(SCAN_LOG_STREAM, uptime_us(), "scan task setup: {}", e);
                }
            });
        if let Err(e) = scan {
            rt_error!(COMMS_LOG_STREAM, uptime_us(), "scan task spawn: {}", e);
        }

        let protocol_uart = UartDriver::new(
            peripherals.uart0,
            pins.gpio1,
            pins.gpio3,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &uart::config::Config::default().baudrate(Hertz(board.protocol_baud)),
        )?;

        ThreadSpawnConfiguration {
            name: Some(b"comms\0"),
            stack_size: TASK_STACK_SIZE,
            priority: COMMS_TASK_PRIORITY,
            ..Default::default()
        }
        .set()?;
        let comms = std::thread::Builder::new()
            .stack_size(TASK_STACK_SIZE)
            .spawn(move || comms_task(protocol_uart, store));
        if let Err(e) = comms {
            rt_error!(COMMS_LOG_STREAM, uptime_us(), "comms task spawn: {}", e);
        }

        ThreadSpawnConfiguration::default().set()?;
        rt_info!(COMMS_LOG_STREAM, uptime_us(), "Controller ready");

        uart_logger_task(&mut log_uart, &log_config, &STATE.faults)
    }

    fn scan_task(mux_pins: [MuxPin; 4], adc1: ADC1, adc_pin: Gpio34) -> Result<(), EspError> {
        let adc = AdcDriver::new(adc1)?;
        let channel_config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let channel = AdcChannelDriver::new(&adc, adc_pin, &channel_config)?;

        let sampler = ChannelSampler::new(Mux::new(mux_pins), EspAnalogInput::new(channel), Ets);
        let scanner = TouchScanner::new(sampler, &STATE);
        let hid = LinkedTransport::new(&HID_LINK, BleKeyboard);
        let mut scheduler = ScanScheduler::new(scanner, hid, ScanConfig::default());

        rt_info!(SCAN_LOG_STREAM, uptime_us(), "Scan loop running");
        scheduler.run(FreeRtos::delay_ms)
    }

    fn comms_task(uart: UartDriver<'static>, store: KeymapStore<EspBlobStore>) {
        let mut handler = ProtocolHandler::new(&STATE, store);
        let mut input = [0u8; 128];

        loop {
            let mut out = UartWriter(&uart);
            loop {
                match uart.read(&mut input, NON_BLOCK) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => handler.feed_bytes(&input[..n], &mut out),
                }
            }
            handler.tick(&[], &mut out);
            FreeRtos::delay_ms(COMMS_INTERVAL_MS);
        }
    }

    /// `fmt::Write` over the protocol UART.
    struct UartWriter<'a>(&'a UartDriver<'static>);

    impl fmt::Write for UartWriter<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0.write(s.as_bytes()).map(|_| ()).map_err(|_| fmt::Error)
        }
    }

    /// Boundary to the BLE HID service.
    ///
    /// The wireless stack (advertising, bonding, GATT report map) is an
    /// external collaborator. It delivers each report by notifying its
    /// input-report characteristic and drives [`HID_LINK`] from its
    /// connect/disconnect events. Until a host links, `LinkedTransport`
    /// drops reports before they reach this sink.
    struct BleKeyboard;

    impl HidTransport for BleKeyboard {
        type Error = EspError;

        fn send_report(&mut self, report: &KeyboardReport) -> Result<(), EspError> {
            rt_debug!(SCAN_LOG_STREAM, uptime_us(), "report {:02X?}", report.as_bytes());
            Ok(())
        }
    }
}
